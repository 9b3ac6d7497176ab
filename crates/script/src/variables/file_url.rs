//! File-URL variable type.
//!
//! Loads the lines of a local file, addressed either as a `file://` URL or
//! a plain path, and hands them to the script whole, sequentially, or at
//! random.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_STRING, TYPE_STRING_ARRAY,
};
use crate::error::ScriptResult;
use rand::Rng;
use tracing::warn;
use url::Url;

/// A script value backed by the lines of a local file.
#[derive(Debug, Default)]
pub struct FileUrlVariable {
    location: String,
    lines: Vec<String>,
    cursor: usize,
}

impl FileUrlVariable {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Resolves the location and loads the file. Returns false on any
    /// failure, leaving previously loaded lines untouched.
    fn load(&mut self, location: &str) -> bool {
        let path = match Url::parse(location) {
            Ok(parsed) if parsed.scheme() == "file" => match parsed.to_file_path() {
                Ok(path) => path,
                Err(_) => {
                    warn!(location, "file URL has no usable path");
                    return false;
                }
            },
            Ok(parsed) => {
                warn!(location, scheme = parsed.scheme(), "unsupported URL scheme");
                return false;
            }
            // Not a URL at all; treat it as a plain filesystem path.
            Err(_) => std::path::PathBuf::from(location),
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                self.location = location.to_string();
                self.lines = contents.lines().map(str::to_string).collect();
                self.cursor = 0;
                true
            }
            Err(e) => {
                warn!(location, error = %e, "failed to read file");
                false
            }
        }
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "seturl",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "getfile",
        argument_types: &[],
        return_type: Some(TYPE_STRING_ARRAY),
    },
    MethodSignature {
        name: "getline",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "randomline",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const SET_URL: usize = 0;
const GET_FILE: usize = 1;
const GET_LINE: usize = 2;
const RANDOM_LINE: usize = 3;

impl Variable for FileUrlVariable {
    fn type_name(&self) -> &'static str {
        "fileurl"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("fileurl", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            SET_URL => VariableValue::Boolean(self.load(&arguments[0].display_string())),
            GET_FILE => VariableValue::TextArray(self.lines.clone()),
            GET_LINE => {
                let value = if self.lines.is_empty() {
                    String::new()
                } else {
                    let line = self.lines[self.cursor].clone();
                    self.cursor = (self.cursor + 1) % self.lines.len();
                    line
                };
                VariableValue::Text(value)
            }
            RANDOM_LINE => {
                let value = if self.lines.is_empty() {
                    String::new()
                } else {
                    let index = rand::thread_rng().gen_range(0..self.lines.len());
                    self.lines[index].clone()
                };
                VariableValue::Text(value)
            }
            other => return Err(invalid_invocation("fileurl", other)),
        };
        Ok(result)
    }

    fn value_string(&self) -> String {
        format!("{} ({} lines)", self.location, self.lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_plain_path() {
        let file = fixture_file("one\ntwo\nthree\n");
        let mut variable = FileUrlVariable::default();
        let path = file.path().display().to_string();
        assert_eq!(
            variable.invoke(SET_URL, &[VariableValue::Text(path)]).unwrap(),
            VariableValue::Boolean(true)
        );
        assert_eq!(
            variable.invoke(GET_FILE, &[]).unwrap(),
            VariableValue::TextArray(vec!["one".into(), "two".into(), "three".into()])
        );
    }

    #[test]
    fn test_load_file_url() {
        let file = fixture_file("alpha\nbeta\n");
        let mut variable = FileUrlVariable::default();
        let location = format!("file://{}", file.path().display());
        assert_eq!(
            variable
                .invoke(SET_URL, &[VariableValue::Text(location)])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        assert_eq!(variable.lines().len(), 2);
    }

    #[test]
    fn test_get_line_wraps() {
        let file = fixture_file("a\nb\n");
        let mut variable = FileUrlVariable::default();
        let path = file.path().display().to_string();
        variable.invoke(SET_URL, &[VariableValue::Text(path)]).unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            let VariableValue::Text(line) = variable.invoke(GET_LINE, &[]).unwrap() else {
                panic!("getline did not return text");
            };
            seen.push(line);
        }
        assert_eq!(seen, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_missing_file_reports_false() {
        let mut variable = FileUrlVariable::default();
        assert_eq!(
            variable
                .invoke(
                    SET_URL,
                    &[VariableValue::Text("/no/such/file.txt".into())]
                )
                .unwrap(),
            VariableValue::Boolean(false)
        );
    }
}
