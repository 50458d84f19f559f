use crate::model::{DataSequence, Dataset, Item, Itemset};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Marker introducing an optional pre-computed record utility.
const UTILITY_MARKER: &str = "SUtility:";

/// Reads a sequence database from a file, one record per line.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> io::Result<Dataset> {
    let file = File::open(path)?;
    parse_dataset(BufReader::new(file))
}

/// Parses a sequence database from any reader. Blank lines and `#` comments
/// are skipped; records that parse to nothing are dropped.
pub fn parse_dataset<R: Read>(reader: BufReader<R>) -> io::Result<Dataset> {
    let mut sequences = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(seq) = parse_line(line) {
            sequences.push(seq);
        }
    }
    Ok(Dataset::new(sequences))
}

/// Parses one record: whitespace-separated `id[utility]` tokens grouped into
/// itemsets, `-1` closing an itemset, `-2` (or end of line) closing the record.
/// A trailing `SUtility: <n>` overrides the derived total utility. Malformed
/// tokens are skipped item-by-item; the record keeps whatever parsed.
pub fn parse_line(line: &str) -> Option<DataSequence> {
    let (data, parsed_utility) = match line.split_once(UTILITY_MARKER) {
        Some((head, tail)) => (head, tail.trim().parse::<u64>().ok()),
        None => (line, None),
    };

    let mut itemsets = Vec::new();
    let mut current: Vec<Item> = Vec::new();

    for token in data.split_whitespace() {
        match token {
            "-1" => {
                if !current.is_empty() {
                    itemsets.push(Itemset::new(std::mem::take(&mut current)));
                }
            }
            "-2" => break,
            _ => {
                if let Some(item) = parse_item(token) {
                    current.push(item);
                }
            }
        }
    }
    if !current.is_empty() {
        itemsets.push(Itemset::new(current));
    }

    if itemsets.is_empty() {
        return None;
    }
    Some(match parsed_utility {
        Some(utility) => DataSequence::with_utility(itemsets, utility),
        None => DataSequence::new(itemsets),
    })
}

fn parse_item(token: &str) -> Option<Item> {
    let open = token.find('[')?;
    let close = token.find(']')?;
    if close <= open {
        return None;
    }
    let id = token[..open].parse().ok()?;
    let utility = token[open + 1..close].parse().ok()?;
    Some(Item::new(id, utility))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_itemsets_and_derived_utility() {
        let seq = parse_line("1[5] 2[3] -1 3[2] -1 -2").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.utility(), 10);
        assert_eq!(seq.itemsets()[0].len(), 2);
        assert_eq!(seq.itemsets()[1].utility_of(3), Some(2));
    }

    #[test]
    fn utility_marker_overrides_derived_sum() {
        let seq = parse_line("1[5] -1 2[3] -1 -2 SUtility: 99").unwrap();
        assert_eq!(seq.utility(), 99);
    }

    #[test]
    fn malformed_tokens_are_skipped_without_losing_the_record() {
        let seq = parse_line("1[5] garbage 2[x] 3[2] -1 -2").unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.itemsets()[0].len(), 2);
        assert_eq!(seq.utility(), 7);
    }

    #[test]
    fn unterminated_last_itemset_is_kept() {
        let seq = parse_line("1[5] -1 2[3]").unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn empty_record_is_dropped() {
        assert!(parse_line("-1 -2").is_none());
        assert!(parse_line("garbage").is_none());
    }

    #[test]
    fn parses_whole_database_with_comments() {
        let text = "# header\n1[5] 2[3] -1 3[2] -1 -2\n\n1[4] -1 2[1] 3[6] -1 -2\n";
        let dataset = parse_dataset(BufReader::new(text.as_bytes())).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.total_utility(), 21);
    }
}
