// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file paragraph primitives.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html> for the
canonical definition of control file syntax.

Multi-line field values are stored in aptly's canonical representation: the
first line gains a leading space and every line keeps a trailing newline.
This mirrors how aptly itself stores multi-line fields, so values read from
a `.deb` on disk compare equal to the same package's fields as reported by
the server (`SHA*` checksum lists in particular).
*/

use {
    crate::error::{AptlyError, Result},
    std::{collections::HashMap, io::BufRead},
};

/// A field in a control paragraph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlField {
    name: String,
    value: String,
}

impl ControlField {
    pub fn new(name: impl ToString, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// The name of this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value, including any embedded newlines for multi-line fields.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An ordered collection of control fields.
///
/// Field names are case insensitive on read and case preserving on set.
/// A paragraph holds at most one occurrence of a field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlParagraph {
    fields: Vec<ControlField>,
}

impl ControlParagraph {
    /// Whether the paragraph has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set the value of a field, replacing any existing value (case
    /// insensitive compare on the name).
    pub fn set_field(&mut self, name: impl ToString, value: impl ToString) {
        let field = ControlField::new(name, value);
        self.fields
            .retain(|f| !f.name.eq_ignore_ascii_case(&field.name));
        self.fields.push(field);
    }

    /// Obtain the field with a given name.
    pub fn field(&self, name: &str) -> Option<&ControlField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Obtain the raw string value of the named field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value())
    }

    /// Obtain the value of a required field.
    pub fn required_field_str(&self, name: &str) -> Result<&str> {
        self.field_str(name).ok_or_else(|| {
            AptlyError::ControlParse(format!("required field missing: {}", name))
        })
    }

    /// Iterate over fields in insertion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField> {
        self.fields.iter()
    }

    /// Convert the paragraph into a name-to-value map.
    pub fn into_map(self) -> HashMap<String, String> {
        self.fields
            .into_iter()
            .map(|f| (f.name, f.value))
            .collect()
    }

    /// Parse the first paragraph from a reader.
    ///
    /// Lines after the terminating blank line are not consumed. Returns an
    /// empty paragraph for empty input.
    pub fn parse_reader<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut parser = ControlParser::default();

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            if parser.write_line(line.trim_end())? {
                break;
            }
        }

        Ok(parser.finish())
    }

    /// Parse the first paragraph from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        Self::parse_reader(&mut std::io::BufReader::new(s.as_bytes()))
    }
}

/// Line-fed parser for a single control paragraph.
#[derive(Clone, Debug, Default)]
struct ControlParser {
    paragraph: ControlParagraph,
    last_field: Option<String>,
    line_num: usize,
}

impl ControlParser {
    /// Feed one line (without its line terminator) to the parser.
    ///
    /// Returns `true` once the paragraph is terminated by a blank line.
    fn write_line(&mut self, line: &str) -> Result<bool> {
        self.line_num += 1;

        if line.trim().is_empty() {
            // Blank lines before any content are skipped; afterwards they
            // terminate the paragraph.
            return Ok(!self.paragraph.is_empty());
        }

        if line.starts_with(|c: char| c.is_ascii_whitespace()) {
            let name = self.last_field.clone().ok_or_else(|| {
                AptlyError::ControlParse(format!(
                    "line {}: continuation without a field: {}",
                    self.line_num, line
                ))
            })?;
            let mut value = self
                .paragraph
                .field_str(&name)
                .unwrap_or_default()
                .to_string();

            // First continuation converts the value to multi-line form: one
            // leading space, every line newline-terminated. aptly does not
            // strip the leading space from the first line of multi-line
            // fields, so neither do we.
            if !value.ends_with('\n') {
                value = format!(" {}\n", value);
            }
            value.push_str(line);
            value.push('\n');

            self.paragraph.set_field(name, value);
            return Ok(false);
        }

        let (name, value) = line.split_once(':').ok_or_else(|| {
            AptlyError::ControlParse(format!(
                "line {}: malformed control line: {}",
                self.line_num, line
            ))
        })?;

        if name.is_empty() || value.trim().is_empty() {
            return Err(AptlyError::ControlParse(format!(
                "line {}: malformed control line: {}",
                self.line_num, line
            )));
        }

        self.paragraph.set_field(name, value.trim());
        self.last_field = Some(name.to_string());

        Ok(false)
    }

    fn finish(self) -> ControlParagraph {
        self.paragraph
    }
}

#[cfg(test)]
mod test {
    use {super::*, indoc::indoc};

    #[test]
    fn parse_simple_paragraph() -> Result<()> {
        let p = ControlParagraph::parse_str(indoc! {"
            Package: aptly
            Version: 1.3.0+ds1-2
            Architecture: amd64
        "})?;

        assert_eq!(p.field_str("Package"), Some("aptly"));
        assert_eq!(p.field_str("Version"), Some("1.3.0+ds1-2"));
        assert_eq!(p.field_str("architecture"), Some("amd64"));
        assert_eq!(p.field_str("Missing"), None);
        assert!(p.required_field_str("Missing").is_err());

        Ok(())
    }

    #[test]
    fn multiline_fields_keep_canonical_form() -> Result<()> {
        let p = ControlParagraph::parse_str(indoc! {"
            Package: rustc
            Description: Rust systems programming language
             Rust is a curly-brace, block-structured language.
             .
             It is a systems language.
        "})?;

        assert_eq!(
            p.field_str("Description"),
            Some(
                " Rust systems programming language\n Rust is a curly-brace, block-structured language.\n .\n It is a systems language.\n"
            )
        );

        Ok(())
    }

    #[test]
    fn paragraph_ends_at_blank_line() -> Result<()> {
        let p = ControlParagraph::parse_str(indoc! {"
            Package: aptly

            Package: other
        "})?;

        assert_eq!(p.field_str("Package"), Some("aptly"));
        assert_eq!(p.iter_fields().count(), 1);

        Ok(())
    }

    #[test]
    fn malformed_lines_rejected() {
        assert!(ControlParagraph::parse_str("no colon here\n").is_err());
        assert!(ControlParagraph::parse_str(": empty name\n").is_err());
        assert!(ControlParagraph::parse_str("Name:\n").is_err());
        assert!(ControlParagraph::parse_str(" floating continuation\n").is_err());
    }

    #[test]
    fn set_field_is_case_insensitive() {
        let mut p = ControlParagraph::default();
        p.set_field("foo", "bar");
        p.set_field("FOO", "baz");
        assert_eq!(p.field_str("foo"), Some("baz"));
        assert_eq!(p.iter_fields().count(), 1);
    }
}
