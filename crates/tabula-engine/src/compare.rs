use std::cmp::Ordering;

/// Byte-wise comparison of two text forms.
pub fn ascii_cmp(a: &str, b: &str) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// Case- and number-aware "dictionary" comparison.
///
/// Digit runs compare numerically (`a9` < `a10`), letters compare
/// case-insensitively, and case differences only break otherwise-equal
/// strings (`Foo` and `foo` stay distinguishable but adjacent).
pub fn dictionary_cmp(a: &str, b: &str) -> Ordering {
    let folded = segments_cmp(a, b, true);
    if folded != Ordering::Equal {
        return folded;
    }
    segments_cmp(a, b, false)
}

fn segments_cmp(a: &str, b: &str, fold_case: bool) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = digit_run(&mut ai);
                let run_b = digit_run(&mut bi);
                let ord = numeric_run_cmp(&run_a, &run_b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let (x, y) = if fold_case {
                    (
                        x.to_lowercase().next().unwrap_or(x),
                        y.to_lowercase().next().unwrap_or(y),
                    )
                } else {
                    (x, y)
                };
                let ord = x.cmp(&y);
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn digit_run(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = iter.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        iter.next();
    }
    run
}

/// Compare two digit runs by value; equal values order by total run length
/// so `1` sorts before `01`.
fn numeric_run_cmp(a: &str, b: &str) -> Ordering {
    let sa = a.trim_start_matches('0');
    let sb = b.trim_start_matches('0');
    sa.len()
        .cmp(&sb.len())
        .then_with(|| sa.cmp(sb))
        .then_with(|| a.len().cmp(&b.len()))
}
