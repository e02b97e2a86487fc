use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(WorkspaceName);
name_newtype!(LogPath);
name_newtype!(PackageId);

/// File-type hint passed to the backend file picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Excel,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Excel => "excel",
        }
    }
}

/// UI languages the backend knows how to serve. The backend keys them by
/// their display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Japanese,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Japanese];

    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Japanese => "Japan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceAction {
    Update,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_labels_match_backend_names() {
        assert_eq!(Language::ALL.map(Language::label), ["English", "Japan"]);
    }

    #[test]
    fn names_serialize_as_plain_strings() {
        let encoded = serde_json::to_string(&LogPath::new("/logs/a.txt")).expect("encode");
        assert_eq!(encoded, "\"/logs/a.txt\"");
    }
}
