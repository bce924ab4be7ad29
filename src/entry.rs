//! Interactive selection of the report destination and the survey export.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("input closed before all files were selected")]
    InputClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub destination: PathBuf,
    pub report_name: String,
    pub source: PathBuf,
}

impl FileSelection {
    pub fn output_path(&self) -> PathBuf {
        self.destination.join(format!("{}.xlsx", self.report_name))
    }
}

pub fn validate_directory(path: &Path) -> Result<(), &'static str> {
    if path.is_file() {
        return Err("the provided path is a file, not a directory");
    }
    if !path.is_dir() {
        return Err("no such directory found");
    }
    Ok(())
}

pub fn validate_report_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("file name can not be left empty".to_string());
    }
    match name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(c) => Err(format!(
            "file name can only contain letters, digits, '-' and '_' | illegal character: '{c}'"
        )),
        None => Ok(()),
    }
}

pub fn validate_source(path: &Path) -> Result<(), &'static str> {
    if path.as_os_str().is_empty() {
        return Err("file path can not be left empty");
    }
    if !path.is_file() {
        return Err("invalid file path");
    }
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err("provided file path does not lead to an .xlsx file");
    }
    Ok(())
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn ask(&mut self, message: &str) -> Result<String, SelectionError> {
        writeln!(
            self.output,
            "[{}] <<-->> {message} <<-->>",
            Local::now().format("%H:%M:%S")
        )?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SelectionError::InputClosed);
        }
        Ok(line.trim().trim_matches('"').to_string())
    }

    fn reject(&mut self, reason: &str) -> Result<(), SelectionError> {
        warn!(reason, "input rejected");
        writeln!(self.output, "Error: {reason}")?;
        Ok(())
    }
}

/// Asks for the destination directory, the report name and the survey
/// export, re-prompting until each answer is valid.
pub fn select_files<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<FileSelection, SelectionError> {
    let mut prompt = Prompter { input, output };

    let destination = loop {
        let answer = PathBuf::from(prompt.ask("Enter the directory to create the report in")?);
        match validate_directory(&answer) {
            Ok(()) => break answer,
            Err(reason) => prompt.reject(reason)?,
        }
    };

    let report_name = loop {
        let answer = prompt.ask("Enter the name of the report file")?;
        if let Err(reason) = validate_report_name(&answer) {
            prompt.reject(&reason)?;
            continue;
        }
        if destination.join(format!("{answer}.xlsx")).exists() {
            let decision = prompt.ask(&format!(
                "A file named '{answer}.xlsx' already exists. Overwrite it? (Y/N)"
            ))?;
            if !decision.eq_ignore_ascii_case("y") {
                continue;
            }
        }
        break answer;
    };

    let source = loop {
        let answer = PathBuf::from(prompt.ask("Enter the path of the survey export")?);
        match validate_source(&answer) {
            Ok(()) => break answer,
            Err(reason) => prompt.reject(reason)?,
        }
    };

    Ok(FileSelection {
        destination,
        report_name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::io::Cursor;

    fn workspace(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("traffic_formatter_entry_{name}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn run(script: &str) -> Result<FileSelection, SelectionError> {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        select_files(&mut input, &mut output)
    }

    #[test]
    fn test_report_name_rules() {
        assert!(validate_report_name("krizovatka_1-ranna").is_ok());
        assert!(validate_report_name("").is_err());
        assert!(validate_report_name("my report").is_err());
        assert!(validate_report_name("správa").is_err());
    }

    #[test]
    fn test_reprompts_until_valid() {
        let dir = workspace("reprompt");
        let source = dir.join("survey.xlsx");
        fs::write(&source, b"").unwrap();
        let not_xlsx = dir.join("survey.csv");
        fs::write(&not_xlsx, b"").unwrap();

        let script = format!(
            "{missing}\n\"{dir}\"\nbad name\nreport\n{csv}\n{source}\n",
            missing = dir.join("nope").display(),
            dir = dir.display(),
            csv = not_xlsx.display(),
            source = source.display(),
        );
        let selection = run(&script).unwrap();

        assert_eq!(selection.destination, dir);
        assert_eq!(selection.report_name, "report");
        assert_eq!(selection.source, source);
        assert_eq!(selection.output_path(), dir.join("report.xlsx"));
    }

    #[test]
    fn test_existing_report_needs_confirmation() {
        let dir = workspace("overwrite");
        fs::write(dir.join("taken.xlsx"), b"").unwrap();
        let source = dir.join("survey.xlsx");
        fs::write(&source, b"").unwrap();

        let script = format!(
            "{dir}\ntaken\nn\ntaken\ny\n{source}\n",
            dir = dir.display(),
            source = source.display(),
        );
        let selection = run(&script).unwrap();
        assert_eq!(selection.report_name, "taken");
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rejections_reach_scoped_console_logger() {
        let dir = workspace("logged");
        let source = dir.join("survey.xlsx");
        fs::write(&source, b"").unwrap();
        let script = format!(
            "{dir}\nbad name\nreport\n{source}\n",
            dir = dir.display(),
            source = source.display(),
        );

        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let selection = tracing::subscriber::with_default(subscriber, || run(&script)).unwrap();

        assert_eq!(selection.report_name, "report");
        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("input rejected"));
        assert!(logged.contains("illegal character: ' '"));
    }

    #[test]
    fn test_closed_input() {
        let err = run("").unwrap_err();
        assert!(matches!(err, SelectionError::InputClosed));
    }
}
