//! Placeholder scanner for SQL text

use std::collections::BTreeMap;

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'#'
}

enum State {
    Text,
    /// inside a placeholder that starts at the given offset
    Name(usize),
}

/// Calls `f` with the colon offset and the name of every placeholder, in text order.
fn scan(sql: &str, mut f: impl FnMut(usize, &str)) {
    let bytes = sql.as_bytes();
    let mut emit = |start: usize, end: usize| {
        if end > start + 1 {
            f(start, &sql[start + 1 .. end]);
        }
    };
    let mut state = State::Text;
    for (i, &c) in bytes.iter().enumerate() {
        state = match state {
            State::Text if c == b':' => State::Name(i),
            State::Text => State::Text,
            State::Name(start) if is_name_char(c) => State::Name(start),
            State::Name(start) => {
                emit(start, i);
                if c == b':' { State::Name(i) } else { State::Text }
            }
        };
    }
    if let State::Name(start) = state {
        emit(start, bytes.len());
    }
}

/**
Finds the `:name` placeholders of a statement. Returns, for every distinct name,
the byte offsets of the colons of its occurrences in increasing order.

Names consist of ASCII letters, digits, `_` and `#`. The scanner does not
look into quotes or comments.

# Example

```
let vars = goracle::find_statement_vars("SELECT :a, :b FROM t WHERE x = :a");
assert_eq!(vars["a"], vec![7, 31]);
assert_eq!(vars["b"], vec![11]);
```
*/
pub fn find_statement_vars(sql: &str) -> BTreeMap<String, Vec<usize>> {
    let mut vars : BTreeMap<String, Vec<usize>> = BTreeMap::new();
    scan(sql, |offset, name| {
        vars.entry(name.to_string()).or_default().push(offset);
    });
    vars
}

/// Returns the number of distinct placeholder names in a statement.
pub fn count_statement_vars(sql: &str) -> usize {
    find_statement_vars(sql).len()
}

/**
Renames every occurrence of a placeholder that is used more than once:
`:x` becomes `:x##1`, `:x##2` and so on. Returns the new text and, for every
renamed placeholder, its new names in text order.
*/
pub(crate) fn uniquify_statement_vars(sql: &str) -> (String, BTreeMap<String, Vec<String>>) {
    let vars = find_statement_vars(sql);
    let mut renames : Vec<(usize, &str)> = Vec::new();
    let mut aliases = BTreeMap::new();
    for (name, offsets) in vars.iter().filter(|(_, offsets)| offsets.len() > 1) {
        let names = (1..=offsets.len()).map(|n| format!("{}##{}", name, n)).collect();
        aliases.insert(name.clone(), names);
        renames.extend(offsets.iter().map(|&offset| (offset, name.as_str())));
    }
    if renames.is_empty() {
        return (sql.to_string(), aliases);
    }
    renames.sort_unstable();

    let mut counters : BTreeMap<&str, usize> = BTreeMap::new();
    let mut text = String::with_capacity(sql.len() + renames.len() * 4);
    let mut copied = 0;
    for (offset, name) in renames {
        let end = offset + 1 + name.len();
        text.push_str(&sql[copied..end]);
        let n = counters.entry(name).or_insert(0);
        *n += 1;
        text.push_str(&format!("##{}", n));
        copied = end;
    }
    text.push_str(&sql[copied..]);
    (text, aliases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        assert_eq!(count_statement_vars("SELECT 1 FROM DUAL"), 0);
        assert_eq!(count_statement_vars("SELECT :1 FROM DUAL"), 1);
        assert_eq!(count_statement_vars("INSERT INTO t VALUES (:a, :b, :a)"), 2);
        assert_eq!(count_statement_vars("BEGIN :x := f(:y#1, :Y_2); END;"), 3);
    }

    #[test]
    fn assignments_are_not_placeholders() {
        let vars = find_statement_vars("BEGIN v := 1; :out := v; END;");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["out"], vec![14]);
    }

    #[test]
    fn offsets_increase() {
        let sql = "UPDATE t SET a = :v, b = :w WHERE c = :v OR d = :v";
        let vars = find_statement_vars(sql);
        let offsets = &vars["v"];
        assert_eq!(offsets.len(), 3);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        for &offset in offsets {
            assert_eq!(&sql[offset..offset + 2], ":v");
        }
        assert_eq!(vars["w"], vec![sql.find(":w").unwrap()]);
    }

    #[test]
    fn placeholders_at_the_end_and_adjacent() {
        let vars = find_statement_vars("SELECT x FROM t WHERE y = :last");
        assert_eq!(vars["last"], vec![26]);
        let vars = find_statement_vars(":a:b");
        assert_eq!(vars["a"], vec![0]);
        assert_eq!(vars["b"], vec![2]);
    }

    #[test]
    fn non_ascii_text() {
        let sql = "SELECT 'árvíztűrő' || :name FROM DUAL";
        let vars = find_statement_vars(sql);
        let offset = vars["name"][0];
        assert_eq!(&sql[offset..offset + 5], ":name");
    }

    #[test]
    fn uniquify() {
        let (sql, aliases) = uniquify_statement_vars("SELECT :a, :b FROM t WHERE x = :a AND y = :a");
        assert_eq!(sql, "SELECT :a##1, :b FROM t WHERE x = :a##2 AND y = :a##3");
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases["a"], vec!["a##1", "a##2", "a##3"]);

        let (sql, aliases) = uniquify_statement_vars("SELECT :a, :b FROM DUAL");
        assert_eq!(sql, "SELECT :a, :b FROM DUAL");
        assert!(aliases.is_empty());
    }

    #[test]
    fn uniquified_names_are_distinct() {
        let (sql, _) = uniquify_statement_vars("BEGIN :x := :x + :y; :y := :x; END;");
        let vars = find_statement_vars(&sql);
        assert_eq!(vars.len(), 5);
        assert!(vars.values().all(|offsets| offsets.len() == 1));
    }
}
