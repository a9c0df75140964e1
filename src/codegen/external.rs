//! Externally supplied parallel lines.
//!
//! Another tool may already know which loops are parallel. It hands over one
//! decimal line number per record, and each line gets the family's default
//! parallel-loop directive without any analysis.

use super::{AnnotationMap, DirectiveFamily};
use crate::utils::errors::AnnotateResult;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Build annotations from a line list.
///
/// Blank records are skipped; records that are not a positive decimal
/// number are skipped with a warning.
pub fn parse_parallel_lines(text: &str, family: DirectiveFamily) -> AnnotationMap {
    let directive = family.parallel_loop("");
    let mut map = AnnotationMap::new();
    for (record_no, record) in text.lines().enumerate() {
        let record = record.trim();
        if record.is_empty() {
            continue;
        }
        match record.parse::<u32>() {
            Ok(line) if line > 0 => {
                map.add(line, &directive);
            }
            _ => warn!("Ignoring parallel line record {}: {:?}", record_no + 1, record),
        }
    }
    debug!("Read {} externally parallel lines", map.len());
    map
}

/// Read and parse a line list file.
pub fn read_parallel_lines(path: &Path, family: DirectiveFamily) -> AnnotateResult<AnnotationMap> {
    let text = fs::read_to_string(path)?;
    Ok(parse_parallel_lines(&text, family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_single_record_generic_family() {
        let map = parse_parallel_lines("42", DirectiveFamily::OpenAcc);
        assert_eq!(map.get(42), Some("#pragma acc loop independent\n"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_openmp_family() {
        let map = parse_parallel_lines("3\n8\n", DirectiveFamily::OpenMpCpu);
        assert_eq!(map.get(3), Some("#pragma omp parallel for\n"));
        assert_eq!(map.get(8), Some("#pragma omp parallel for\n"));
    }

    #[test]
    fn test_bad_records_skipped() {
        let map = parse_parallel_lines("5\n\n  \nabc\n0\n-2\n5\n", DirectiveFamily::OpenAcc);
        assert_eq!(map.lines().collect::<Vec<_>>(), vec![5]);
        assert_eq!(map.get(5), Some("#pragma acc loop independent\n"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "12").unwrap();
        writeln!(file, "30").unwrap();
        let map = read_parallel_lines(file.path(), DirectiveFamily::OpenMpGpu).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = read_parallel_lines(Path::new("/nonexistent/lines.txt"), DirectiveFamily::OpenAcc);
        assert!(result.is_err());
    }
}
