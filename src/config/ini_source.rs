use camino::{Utf8Path, Utf8PathBuf};
use config::{ConfigError, Map, Source, Value, ValueKind};
use ini::{Ini, ParseOption};

/// INI file source that keeps values literal.
///
/// Backslashes and quotes are not interpreted, so `C:\Program Files\...` and
/// `\\server\printer` reach the settings unchanged. Keys keep their case.
#[derive(Debug, Clone)]
pub struct LiteralIniFile {
    path: Utf8PathBuf,
}

impl LiteralIniFile {
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse_option() -> ParseOption {
        ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        }
    }
}

impl Source for LiteralIniFile {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let ini = Ini::load_from_file_opt(self.path.as_std_path(), Self::parse_option())
            .map_err(|e| ConfigError::Foreign(Box::new(e)))?;

        let origin = Some(self.path.to_string());
        let mut map: Map<String, Value> = Map::new();

        for (section, properties) in ini.iter() {
            let mut entries: Map<String, Value> = Map::new();
            for (key, value) in properties.iter() {
                entries.insert(
                    key.to_string(),
                    Value::new(origin.as_ref(), ValueKind::String(value.to_string())),
                );
            }

            match section {
                Some(section) => {
                    map.insert(
                        section.to_string(),
                        Value::new(origin.as_ref(), ValueKind::Table(entries)),
                    );
                }
                None => map.extend(entries),
            }
        }

        Ok(map)
    }
}
