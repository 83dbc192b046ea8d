//! Generic key/value view of a line-oriented directory document.
//!
//! Every non-blank line is an item: the first whitespace-separated token is
//! the keyword, and the rest of the line (re-joined with single spaces) is
//! the value.  A keyword alone on its line may be followed by an object
//! enclosed in `BEGIN`/`END` marker lines, whose interior lines become the
//! value.  Repeated keywords are merged rather than overwritten.

use std::collections::BTreeMap;
use std::io::Read;

use itertools::Itertools;

use crate::{Error, Result};

/// Separator placed between the values of a keyword that appears more than once.
pub const REPEAT_DELIMITER: char = '|';

/// A directory document reduced to a keyword → value mapping.
///
/// No validation is done beyond splitting lines: this view is meant for
/// pulling a handful of fields out of documents whose exact shape we don't
/// care about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Map from keyword to (possibly merged) value.
    items: BTreeMap<String, String>,
}

/// Return true if `line` is an object marker of the given kind.
///
/// A marker is any token that is exactly `kind` once its surrounding dashes
/// are removed, so both `BEGIN` and `-----BEGIN RSA PUBLIC KEY-----` count.
fn is_marker(line: &str, kind: &str) -> bool {
    line.split_whitespace()
        .any(|tok| tok.trim_matches('-') == kind)
}

impl ParsedDocument {
    /// Split `text` into items.
    pub fn parse(text: &str) -> Self {
        let mut doc = ParsedDocument::default();
        let mut lines = text.lines().peekable();

        while let Some(line) = lines.next() {
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let rest = tokens.join(" ");

            if !rest.is_empty() {
                doc.add_item(keyword, &rest);
                continue;
            }

            if lines.peek().is_some_and(|next| is_marker(next, "BEGIN")) {
                let _begin = lines.next();
                let object: String = lines
                    .by_ref()
                    .take_while(|l| !is_marker(l, "END"))
                    .map(str::trim)
                    .collect();
                doc.add_item(keyword, &object);
            } else {
                doc.add_item(keyword, "");
            }
        }
        doc
    }

    /// Read a whole document from `reader` and split it into items.
    ///
    /// Fails only if the reader fails or yields something other than UTF-8.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text))
    }

    /// Record `value` under `keyword`, merging it with any earlier value.
    pub fn add_item(&mut self, keyword: &str, value: &str) {
        self.items
            .entry(keyword.to_owned())
            .and_modify(|old| {
                old.push(REPEAT_DELIMITER);
                old.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }

    /// Return the value stored for `keyword`, if any.
    ///
    /// For a repeated keyword this is every value joined by [`REPEAT_DELIMITER`].
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.items.get(keyword).map(String::as_str)
    }

    /// Return the value stored for `keyword`, or [`Error::MissingKey`].
    pub fn require(&self, keyword: &str) -> Result<&str> {
        self.get(keyword)
            .ok_or_else(|| Error::MissingKey(keyword.to_owned()))
    }

    /// Return every value of a keyword that appeared more than once, in
    /// document order.
    ///
    /// Fails with [`Error::NotArrayItem`] if the keyword was only seen once,
    /// so only use this on keywords known to repeat.
    pub fn get_array(&self, keyword: &str) -> Result<Vec<&str>> {
        let value = self.require(keyword)?;
        let parts: Vec<&str> = value.split(REPEAT_DELIMITER).collect();
        if parts.len() < 2 {
            return Err(Error::NotArrayItem(keyword.to_owned()));
        }
        Ok(parts)
    }

    /// Iterate over the keywords in this document, in sorted order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.keys().map(String::as_str)
    }

    /// Return the number of distinct keywords.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return true if the document had no items at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod test {
    // @@ begin test lint list maintained by maint/add_warning @@
    #![allow(clippy::bool_assert_comparison)]
    #![allow(clippy::clone_on_copy)]
    #![allow(clippy::dbg_macro)]
    #![allow(clippy::mixed_attributes_style)]
    #![allow(clippy::print_stderr)]
    #![allow(clippy::print_stdout)]
    #![allow(clippy::single_char_pattern)]
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::unchecked_time_subtraction)]
    #![allow(clippy::useless_vec)]
    #![allow(clippy::needless_pass_by_value)]
    //! <!-- @@ end test lint list maintained by maint/add_warning @@ -->
    use super::*;

    const DESC: &str = "\
router moria1 128.31.0.34 9101 0 9131

platform Tor 0.4.8.9 on Linux
published 2024-01-01 00:00:00
fingerprint 9695 DFC3 5FFE B861 329B  9F1A B04C 4639 7020 CE31
hibernating
onion-key
-----BEGIN RSA PUBLIC KEY-----
MIGJAoGBAKd
UqNSHnqkq
-----END RSA PUBLIC KEY-----
family $AAAA
family $BBBB
family $CCCC
";

    #[test]
    fn simple_items() {
        let doc = ParsedDocument::parse(DESC);
        assert_eq!(doc.get("router"), Some("moria1 128.31.0.34 9101 0 9131"));
        assert_eq!(
            doc.get("fingerprint"),
            Some("9695 DFC3 5FFE B861 329B 9F1A B04C 4639 7020 CE31")
        );
        assert_eq!(doc.get("hibernating"), Some(""));
        assert_eq!(doc.get("nonesuch"), None);
        assert!(matches!(
            doc.require("nonesuch"),
            Err(Error::MissingKey(k)) if k == "nonesuch"
        ));
    }

    #[test]
    fn object_block() {
        let doc = ParsedDocument::parse(DESC);
        assert_eq!(doc.get("onion-key"), Some("MIGJAoGBAKdUqNSHnqkq"));
        // Marker lines are not items of their own.
        assert!(doc.keywords().all(|k| !k.starts_with("-----")));
        // Parsing continues normally after the END line.
        assert!(doc.get("family").is_some());
    }

    #[test]
    fn bare_markers() {
        let doc = ParsedDocument::parse("key\nBEGIN\nabc\nENDIVE\ndef\nEND\nafter 1\n");
        // "ENDIVE" is not an END marker.
        assert_eq!(doc.get("key"), Some("abcENDIVEdef"));
        assert_eq!(doc.get("after"), Some("1"));
    }

    #[test]
    fn repeated_keys() {
        let doc = ParsedDocument::parse(DESC);
        assert_eq!(doc.get("family"), Some("$AAAA|$BBBB|$CCCC"));
        assert_eq!(
            doc.get_array("family").unwrap(),
            vec!["$AAAA", "$BBBB", "$CCCC"]
        );
        assert!(matches!(
            doc.get_array("router"),
            Err(Error::NotArrayItem(_))
        ));
        assert!(matches!(
            doc.get_array("absent"),
            Err(Error::MissingKey(_))
        ));
    }

    #[test]
    fn blank_and_spacing() {
        let doc = ParsedDocument::parse("\n\n   \na   b\t\tc  \n\n");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("a"), Some("b c"));
        assert!(ParsedDocument::parse("").is_empty());
    }

    #[test]
    fn unterminated_block() {
        let doc = ParsedDocument::parse("key\n-----BEGIN X-----\nabc\ndef");
        assert_eq!(doc.get("key"), Some("abcdef"));
    }

    #[test]
    fn read_errors() {
        let doc = ParsedDocument::read_from(&b"a 1\nb 2\n"[..]).unwrap();
        assert_eq!(doc.get("b"), Some("2"));

        let bad: &[u8] = &[b'a', b' ', 0xff, 0xfe, b'\n'];
        assert!(matches!(ParsedDocument::read_from(bad), Err(Error::Io(_))));
    }
}
