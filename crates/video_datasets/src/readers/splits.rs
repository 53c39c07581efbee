use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const TEST_LIST: &str = "testlist03.txt";

/// Entries of the evaluation splits, read from [`TEST_LIST`].
///
/// The list is alternated: every third line (line index `% 3 == 0`) is used for
/// validation, the other two thirds for testing. Returns `(valid, test)`.
pub fn read_eval_splits(dir: impl AsRef<Path>) -> Result<(Vec<String>, Vec<String>)> {
    let (valid, test): (Vec<_>, Vec<_>) = read_first_tokens(&dir.as_ref().join(TEST_LIST))?
        .into_iter()
        .partition(|(line, _)| line % 3 == 0);
    Ok((
        valid.into_iter().map(|(_, entry)| entry).collect(),
        test.into_iter().map(|(_, entry)| entry).collect(),
    ))
}

/// File stems of split entries, e.g. `ApplyEyeMakeup/v_ApplyEyeMakeup_g01_c01.avi`
/// becomes `v_ApplyEyeMakeup_g01_c01`. Serialized clips are named after these stems.
pub fn split_stems(entries: &[String]) -> HashSet<String> {
    entries
        .iter()
        .filter_map(|entry| Path::new(entry).file_stem()?.to_str().map(str::to_owned))
        .collect()
}

/// `(line_index, first_token)` for every line. Line indices count blank lines too,
/// so the validation alternation follows the physical file.
fn read_first_tokens(path: &Path) -> Result<Vec<(usize, String)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read split list: {}", path.display()))?;
    Ok(content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| line.split_whitespace().next().map(|t| (i, t.to_owned())))
        .collect())
}
