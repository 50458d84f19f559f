use crate::model::Pattern;
use std::io::{self, Write};
use std::time::Duration;

/// Writes the ranked top-k with run metrics.
pub fn write_results<W: Write>(
    out: &mut W,
    ranked: &[(Pattern, u64)],
    elapsed: Duration,
    memory_mb: Option<f64>,
) -> io::Result<()> {
    writeln!(out, "=== Mining Results ===")?;
    writeln!(out, "Runtime: {} ms", elapsed.as_millis())?;
    match memory_mb {
        Some(mb) => writeln!(out, "Memory: {:.2} MB", mb)?,
        None => writeln!(out, "Memory: n/a")?,
    }
    writeln!(out, "Top-K size: {}", ranked.len())?;
    writeln!(out)?;
    write_top_k(out, ranked)
}

/// Writes only the ranked patterns, one block per rank.
pub fn write_top_k<W: Write>(out: &mut W, ranked: &[(Pattern, u64)]) -> io::Result<()> {
    writeln!(out, "=== Top-{} High Utility Sequential Patterns ===", ranked.len())?;
    for (rank, (pattern, utility)) in ranked.iter().enumerate() {
        writeln!(out, "[{}] Utility: {} - {}", rank + 1, utility, pattern)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ranked_patterns() {
        let ranked = vec![
            (Pattern::from_itemsets([vec![1, 2], vec![3]]), 25u64),
            (Pattern::singleton(4), 9u64),
        ];
        let mut buf = Vec::new();
        write_results(&mut buf, &ranked, Duration::from_millis(1500), Some(3.25)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Runtime: 1500 ms"));
        assert!(text.contains("Memory: 3.25 MB"));
        assert!(text.contains("[1] Utility: 25 - <{1,2},{3}>"));
        assert!(text.contains("[2] Utility: 9 - <{4}>"));
    }
}
