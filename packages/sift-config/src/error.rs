use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read sift config {path:?}.")]
	ReadConfig { path: PathBuf, source: io::Error },
	#[error("Sift config {path:?} is not valid TOML for the expected schema.")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("Invalid sift config: {message}")]
	Validation { message: String },
}
