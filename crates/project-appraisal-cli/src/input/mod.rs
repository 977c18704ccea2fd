pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a command's input from `--input`, falling back to piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path);
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(value),
        None => {
            Err(format!("--input <file.json|file.yaml> or stdin required for {command}").into())
        }
    }
}

/// Like [`load`], but `None` when neither a file nor stdin is given.
pub fn try_load<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => file::read_input(path).map(Some),
        None => stdin::read_stdin(),
    }
}
