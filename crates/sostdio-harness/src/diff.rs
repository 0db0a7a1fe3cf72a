//! Diff rendering for transcript comparison.

/// Render the first divergence between an expected and an actual
/// transcript, one step per line.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let exp: Vec<&str> = expected.lines().collect();
    let act: Vec<&str> = actual.lines().collect();
    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..exp.len().max(act.len()) {
        let e = exp.get(i).copied();
        let a = act.get(i).copied();
        if e != a {
            out.push_str(&format!("@@ step {} @@\n", i + 1));
            out.push_str(&format!("-{}\n", e.unwrap_or("<none>")));
            out.push_str(&format!("+{}\n", a.unwrap_or("<none>")));
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_transcripts() {
        assert_eq!(render_diff("a\nb", "a\nb"), "[identical]");
    }

    #[test]
    fn reports_only_first_mismatch() {
        let d = render_diff("open => ok\ntell => 3\nflush => ok", "open => ok\ntell => 4\nflush => err");
        assert!(d.contains("@@ step 2 @@"));
        assert!(d.contains("-tell => 3"));
        assert!(d.contains("+tell => 4"));
        assert!(!d.contains("flush"));
    }

    #[test]
    fn missing_trailing_step() {
        let d = render_diff("open => ok\nclose => ok", "open => ok");
        assert!(d.contains("-close => ok"));
        assert!(d.contains("+<none>"));
    }
}
