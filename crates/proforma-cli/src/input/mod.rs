pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a typed input from `--input <file>`, or from piped stdin.
///
/// `what` names the expected document in the error when neither is given.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        tracing::debug!(path, "reading {what} from file");
        return file::read_json(path);
    }
    match stdin::read_stdin()? {
        Some(data) => {
            tracing::debug!("reading {what} from stdin");
            Ok(serde_json::from_value(data)?)
        }
        None => Err(format!("--input <file.json> or stdin required: expected {what}").into()),
    }
}
