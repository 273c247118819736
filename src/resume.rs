use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{ExportError, Result};

/// How much of the output tail gets pulled in per backward step.
const CHUNK: u64 = 64 * 1024;

/// Find the company id of the last syntactically valid line of a previous
/// run's output.
///
/// The previous run may have died mid-write, so the file can end in a
/// truncated or garbled line; those are skipped walking backward until a
/// line parses as JSON carrying a `company.id`. Returns `Ok(None)` for a
/// missing or empty file (nothing to resume from, start fresh) and an
/// error when the file has content but no valid line at all.
pub fn last_company_id(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let len = seek(&mut file, SeekFrom::End(0), path)?;
    if len == 0 {
        return Ok(None);
    }

    let mut end = len;
    let mut tail: Vec<u8> = Vec::new();
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let mut chunk = vec![0u8; (end - start) as usize];
        seek(&mut file, SeekFrom::Start(start), path)?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&tail);
        tail = chunk;

        if let Some(id) = scan_lines(&tail, start > 0) {
            return Ok(Some(id));
        }
        end = start;
    }
    Err(ExportError::ResumeNoValidLine {
        path: path.display().to_string(),
    })
}

/// A prior crash can leave the output ending mid-line. Terminate that
/// line so the next appended record starts on a line of its own instead
/// of concatenating onto the wreckage.
pub fn seal_partial_tail(path: &Path) -> Result<()> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let len = seek(&mut file, SeekFrom::End(0), path)?;
    if len == 0 {
        return Ok(());
    }
    seek(&mut file, SeekFrom::Start(len - 1), path)?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        let mut out = OpenOptions::new().append(true).open(path)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Resuming needs random access on the output; anything that cannot seek
/// (a pipe, some filesystems) is a hard capability error, not a silent
/// restart from scratch.
fn seek(file: &mut File, pos: SeekFrom, path: &Path) -> Result<u64> {
    file.seek(pos).map_err(|source| ExportError::ResumeUnsupported {
        path: path.display().to_string(),
        source,
    })
}

/// Walk the buffered lines last-to-first, returning the first `company.id`
/// that parses. When the buffer starts mid-file its first line may be
/// incomplete, so it only gets considered once the next chunk extends it.
fn scan_lines(buf: &[u8], first_may_be_partial: bool) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let mut lines: Vec<&str> = text.split('\n').collect();
    if first_may_be_partial && !lines.is_empty() {
        lines.remove(0);
    }
    for line in lines.iter().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(id) = value
                .get("company")
                .and_then(|company| company.get("id"))
                .and_then(|id| id.as_str())
            {
                return Some(id.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn named(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_means_fresh_start() {
        assert_eq!(
            last_company_id(Path::new("does/not/exist.json")).unwrap(),
            None
        );
    }

    #[test]
    fn empty_file_means_fresh_start() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(last_company_id(file.path()).unwrap(), None);
    }

    #[test]
    fn picks_the_last_valid_line() {
        let file = named(&[
            r#"{"company":{"id":"c:1"},"people":[],"funding_rounds":[]}"#,
            r#"{"company":{"id":"c:5"},"people":[],"funding_rounds":[]}"#,
        ]);
        assert_eq!(last_company_id(file.path()).unwrap().as_deref(), Some("c:5"));
    }

    #[test]
    fn skips_a_truncated_tail() {
        let mut file = named(&[r#"{"company":{"id":"c:1"},"people":[],"funding_rounds":[]}"#]);
        // A crash mid-write leaves a partial line with no newline.
        write!(file, r#"{{"company":{{"id":"c:"#).unwrap();
        file.flush().unwrap();
        assert_eq!(last_company_id(file.path()).unwrap().as_deref(), Some("c:1"));
    }

    #[test]
    fn sealing_terminates_a_partial_line_once() {
        let mut file = named(&[r#"{"company":{"id":"c:1"},"people":[],"funding_rounds":[]}"#]);
        write!(file, "{{\"company\":{{\"id").unwrap();
        file.flush().unwrap();
        seal_partial_tail(file.path()).unwrap();
        seal_partial_tail(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.ends_with("{\"company\":{\"id\n"));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn garbage_only_file_is_fatal() {
        let file = named(&["not json at all", "{broken"]);
        let err = last_company_id(file.path()).unwrap_err();
        assert!(matches!(err, ExportError::ResumeNoValidLine { .. }));
    }

    #[test]
    fn valid_json_without_company_id_does_not_count() {
        let file = named(&[
            r#"{"company":{"id":"c:7"},"people":[],"funding_rounds":[]}"#,
            r#"{"unrelated":true}"#,
        ]);
        assert_eq!(last_company_id(file.path()).unwrap().as_deref(), Some("c:7"));
    }
}
