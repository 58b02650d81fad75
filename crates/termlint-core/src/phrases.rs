//! Reference phrase list loading.
//!
//! Two formats are accepted:
//! - CSV (default): a header row, then one phrase per row in the first column.
//!   Extra columns (notes, owners, dates) are ignored.
//! - Plain text (`.txt`): one phrase per line; lines starting with `#` are
//!   comments.
//!
//! Loading returns raw strings. Normalization (trim, lower-case, drop blanks,
//! tokenize) happens in [`Matcher::prepare_phrases`](crate::Matcher::prepare_phrases).

use std::io::Read;

use camino::Utf8Path;

use crate::error::{InputError, InputResult};

/// Default phrase list path, relative to the working directory.
pub const DEFAULT_PHRASES_FILE: &str = "Standardised terms.csv";

/// Load raw phrases from `path`, picking the format from its extension.
#[tracing::instrument(fields(path = %path))]
pub fn load_phrases(path: &Utf8Path) -> InputResult<Vec<String>> {
    let io_err = |source| InputError::Io {
        path: path.to_owned(),
        source,
    };

    let phrases = if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    {
        let content = std::fs::read_to_string(path).map_err(io_err)?;
        parse_text(&content)
    } else {
        let file = std::fs::File::open(path).map_err(io_err)?;
        parse_csv(file)?
    };

    tracing::debug!(count = phrases.len(), "phrase list loaded");
    Ok(phrases)
}

/// Read the first column of a headed CSV.
pub fn parse_csv<R: Read>(reader: R) -> InputResult<Vec<String>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut phrases = Vec::new();
    for row in csv.records() {
        let row = row?;
        if let Some(first) = row.get(0)
            && !first.is_empty()
        {
            phrases.push(first.to_string());
        }
    }
    Ok(phrases)
}

/// One phrase per non-blank, non-comment line.
pub fn parse_text(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn csv_reads_first_column_after_header() {
        let data = "Standardised terms,Owner\nKey Performance Indicator,ops\nOnboarding,hr\n";
        let phrases = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(phrases, vec!["Key Performance Indicator", "Onboarding"]);
    }

    #[test]
    fn csv_skips_empty_cells_and_handles_quotes() {
        let data = "term\n\"Return on investment, annualised\"\n,\n  stakeholder  \n";
        let phrases = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(
            phrases,
            vec!["Return on investment, annualised", "stakeholder"]
        );
    }

    #[test]
    fn header_only_csv_is_empty() {
        assert!(parse_csv("term\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn text_skips_blanks_and_comments() {
        let phrases = parse_text("# approved terms\nkpi\n\n  onboarding \n");
        assert_eq!(phrases, vec!["kpi", "onboarding"]);
    }

    #[test]
    fn load_dispatches_on_extension() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let csv_path = root.join("terms.csv");
        std::fs::write(&csv_path, "term\nkpi\n").unwrap();
        assert_eq!(load_phrases(&csv_path).unwrap(), vec!["kpi"]);

        let txt_path = root.join("terms.txt");
        std::fs::write(&txt_path, "term\nkpi\n").unwrap();
        assert_eq!(load_phrases(&txt_path).unwrap(), vec!["term", "kpi"]);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_phrases(Utf8Path::new("/nonexistent/terms.csv")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/terms.csv"));
    }
}
