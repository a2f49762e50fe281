use indexmap::IndexMap;

use crate::shell::MAX_LINE_LENGTH;

/// Upper bound on repeated substitution passes over one token
pub const MAX_SUBSTITUTION_PASSES: usize = 10;

/// Shell variables in insertion order.
///
/// Overwriting a name keeps its original position.
#[derive(Debug, Default, Clone)]
pub struct Variables {
    values: IndexMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub trait Substitute {
    /// Runs one pass replacing every `$name$` in `raw`.
    ///
    /// The flag is set when the pass saw a variable reference, even one
    /// that expanded to nothing.
    fn substitute(&self, raw: &str) -> (String, bool);
}

impl Substitute for Variables {
    fn substitute(&self, raw: &str) -> (String, bool) {
        let mut output = String::with_capacity(raw.len());
        let mut changed = false;
        let mut rest = raw;

        while let Some(start) = rest.find('$') {
            push_capped(&mut output, &rest[..start]);
            changed = true;
            let after = &rest[start + 1..];
            match after.find('$') {
                Some(end) => {
                    if let Some(value) = self.get(&after[..end]) {
                        push_capped(&mut output, value);
                    }
                    rest = &after[end + 1..];
                }
                // an unmatched `$` swallows the rest of the token
                None => return (output, changed),
            }
        }
        push_capped(&mut output, rest);
        (output, changed)
    }
}

fn push_capped(output: &mut String, text: &str) {
    let room = MAX_LINE_LENGTH.saturating_sub(output.len());
    if text.len() <= room {
        output.push_str(text);
    } else {
        let mut end = room;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        output.push_str(&text[..end]);
    }
}

/// Substitutes repeatedly until a pass changes nothing or the pass limit is hit
pub fn expand(substitute: &impl Substitute, raw: &str) -> String {
    let (mut expanded, mut changed) = substitute.substitute(raw);
    let mut passes = 1;
    while changed && passes < MAX_SUBSTITUTION_PASSES {
        (expanded, changed) = substitute.substitute(&expanded);
        passes += 1;
    }
    expanded
}
