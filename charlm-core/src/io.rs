use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::model::error::ModelError;

/// Reads a whole text file into a `String`.
///
/// Line breaks are preserved: they are characters like any other.
pub fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	fs::File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Reads several text files, attaching the failing path to errors.
pub fn read_texts<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>, ModelError> {
	paths
		.iter()
		.map(|path| read_file(path).map_err(|e| ModelError::io(path.as_ref(), e)))
		.collect()
}

/// Lists the regular files directly contained in a directory.
///
/// Returns full paths, sorted so that callers see a stable order.
pub fn list_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lists_only_files_in_order() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::create_dir(dir.path().join("nested")).unwrap();

		let files = list_files(dir.path()).unwrap();
		let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
		assert_eq!(names, vec!["a.txt", "b.txt"]);
	}

	#[test]
	fn read_texts_reports_missing_path() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.txt");
		let err = read_texts(&[&missing]).unwrap_err();
		assert!(err.to_string().contains("missing.txt"));
	}

	#[test]
	fn read_file_keeps_line_breaks() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("t.txt");
		fs::write(&path, "one\ntwo\n").unwrap();
		assert_eq!(read_file(&path).unwrap(), "one\ntwo\n");
	}
}
