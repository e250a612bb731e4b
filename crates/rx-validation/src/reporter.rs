//! Validation issues and reports

use std::fmt;

/// A single structural mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location in the data, `$` being the document root
    pub path: String,
    /// What did not match
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found when validating a document against a root type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Root type the document was checked against
    pub root: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(root: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            root: root.into(),
            issues,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// First issue, if any
    #[must_use]
    pub fn first(&self) -> Option<&ValidationIssue> {
        self.issues.first()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data does not match '{}'", self.root)?;
        for (idx, issue) in self.issues.iter().enumerate() {
            let separator = if idx == 0 { ": " } else { "; " };
            write!(f, "{separator}{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new("$.tag", "expected //str, found integer");
        assert_eq!(issue.to_string(), "$.tag: expected //str, found integer");
    }

    #[test]
    fn test_report_renders_on_one_line() {
        let report = ValidationReport::new(
            "/app",
            vec![
                ValidationIssue::new("$.name", "missing required entry"),
                ValidationIssue::new("$.tag", "expected //str, found integer"),
            ],
        );

        let rendered = report.to_string();
        assert_eq!(
            rendered,
            "data does not match '/app': $.name: missing required entry; $.tag: expected //str, found integer"
        );
        assert!(!rendered.contains('\n'));
        assert_eq!(report.len(), 2);
        assert_eq!(report.first().unwrap().path, "$.name");
    }
}
