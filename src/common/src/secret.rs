/*
   Directory uniqueness guard
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use std::io::{Error, ErrorKind};
use std::path::Path;
use zeroize::Zeroizing;

/// Read a credential from a single-line secret file such as
/// `/etc/machine.secret`. Only the first line is used, and only its
/// trailing newline is removed; everything else is taken verbatim.
pub fn read_secret<P: AsRef<Path>>(path: P) -> std::io::Result<Zeroizing<String>> {
    let contents = Zeroizing::new(std::fs::read_to_string(path.as_ref())?);
    let line = match contents.find('\n') {
        Some(idx) => &contents[..idx],
        None => contents.as_str(),
    };
    if line.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("secret file {} is empty", path.as_ref().display()),
        ));
    }
    Ok(Zeroizing::new(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_temp_secret(contents: &str) -> String {
        let file_path = format!("/tmp/samguard_test_secret_{}", uuid::Uuid::new_v4());
        fs::write(&file_path, contents).expect("Failed to write temporary secret file");
        file_path
    }

    #[test]
    fn test_read_secret_strips_newline() {
        let path = create_temp_secret("hunter2\n");
        assert_eq!(read_secret(&path).unwrap().as_str(), "hunter2");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_read_secret_without_newline() {
        let path = create_temp_secret("hunter2");
        assert_eq!(read_secret(&path).unwrap().as_str(), "hunter2");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_read_secret_verbatim() {
        // Whitespace inside or around the credential is significant
        let path = create_temp_secret(" pass word \r\nsecond line\n");
        assert_eq!(read_secret(&path).unwrap().as_str(), " pass word \r");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_read_secret_empty() {
        let path = create_temp_secret("");
        let err = read_secret(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_read_secret_missing() {
        let err = read_secret("/nonexistent/samguard/machine.secret").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
