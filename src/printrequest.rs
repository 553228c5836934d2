//! Print requests: the output columns a query asks for
//!
//! The algebra treats them as opaque payload that travels with description
//! nodes. They are written `?Target#format=Label` in parameter lists.

use chumsky::prelude::*;

use crate::datavalue::PropertyRef;

/// What a print request prints
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrintMode {
    /// The result page itself
    This,
    /// The categories of the result page
    Category,
    /// Values of a property
    Property(PropertyRef),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrintRequest {
    pub mode: PrintMode,
    pub label: String,
    pub format: Option<String>,
}

impl PrintRequest {
    pub fn this(label: impl Into<String>) -> Self {
        Self {
            mode: PrintMode::This,
            label: label.into(),
            format: None,
        }
    }

    pub fn category() -> Self {
        Self {
            mode: PrintMode::Category,
            label: "Category".to_string(),
            format: None,
        }
    }

    pub fn property(property: PropertyRef) -> Self {
        let label = property.label();
        Self {
            mode: PrintMode::Property(property),
            label,
            format: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    fn target(&self) -> String {
        match &self.mode {
            PrintMode::This => String::new(),
            PrintMode::Category => "Category".to_string(),
            PrintMode::Property(p) => p.label(),
        }
    }

    /// `?Target#format=Label`, omitting the label when it is the default one
    pub fn serialization(&self) -> String {
        let target = self.target();
        let mut out = format!("?{}", target);
        if let Some(format) = &self.format {
            out.push('#');
            out.push_str(format);
        }
        if self.label != target {
            out.push('=');
            out.push_str(&self.label);
        }
        out
    }
}

/// Syntax pieces of a `?Target#format=Label` statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrintoutSyntax {
    pub target: String,
    pub format: Option<String>,
    pub label: Option<String>,
}

fn printout_syntax() -> impl Parser<char, PrintoutSyntax, Error = Simple<char>> {
    let target = none_of("#=").repeated().collect::<String>();
    let format = just('#')
        .ignore_then(none_of("=").repeated().collect::<String>())
        .or_not();
    let label = just('=')
        .ignore_then(any().repeated().collect::<String>())
        .or_not();

    just('?')
        .ignore_then(target)
        .then(format)
        .then(label)
        .then_ignore(end())
        .map(|((target, format), label)| PrintoutSyntax {
            target: target.trim().to_string(),
            format: format.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()),
            label: label.map(|l| l.trim().to_string()),
        })
}

/// Split a print statement into its parts. Fails if it does not start
/// with `?`.
pub fn parse_printout_syntax(text: &str) -> Result<PrintoutSyntax, String> {
    printout_syntax().parse(text.trim()).map_err(|errs| {
        errs.first()
            .map(|e| format!("malformed print statement at offset {}", e.span().start))
            .unwrap_or_else(|| "malformed print statement".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datavalue::DataType;

    #[test]
    fn test_syntax_parts() {
        let s = parse_printout_syntax("?Population#-n=People").unwrap();
        assert_eq!(s.target, "Population");
        assert_eq!(s.format.as_deref(), Some("-n"));
        assert_eq!(s.label.as_deref(), Some("People"));

        let s = parse_printout_syntax("? ").unwrap();
        assert_eq!(s.target, "");
        assert_eq!(s.format, None);
        assert_eq!(s.label, None);

        assert!(parse_printout_syntax("Population").is_err());
    }

    #[test]
    fn test_serialization_omits_default_label() {
        let p = PrintRequest::property(PropertyRef::new("Population", DataType::Number));
        assert_eq!(p.serialization(), "?Population");
        let p = p.with_label("People").with_format("-n");
        assert_eq!(p.serialization(), "?Population#-n=People");
        assert_eq!(PrintRequest::this("").serialization(), "?");
    }
}
