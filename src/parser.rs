//! Output scanners that pull typed values out of engine output.

use crate::exec::StreamCallback;
use tracing::debug;

const LENGTH_LABEL: &str = "Length";

/// Picks the duration out of `sox <file> -n stat` output, e.g.
/// `Length (seconds):      3.250000`.
///
/// Lines that do not start with `Length`, do not split into exactly two
/// parts on `:`, or carry an unparsable number are skipped; the last good
/// value stays in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LengthParser {
    length: Option<f64>,
    exit_code: Option<i32>,
}

impl LengthParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration in seconds, if a valid `Length` line has been seen.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    /// Exit code, once the run has completed.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn consume(&mut self, line: &str) {
        if !line.starts_with(LENGTH_LABEL) {
            return;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            return;
        }
        match parts[1].trim().parse::<f64>() {
            Ok(value) => self.length = Some(value),
            Err(e) => debug!("Ignoring malformed length line {:?}: {}", line, e),
        }
    }
}

impl StreamCallback for LengthParser {
    fn shell_out(&mut self, line: &str) {
        self.consume(line);
    }

    fn process_complete(&mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_length() {
        let mut parser = LengthParser::new();
        parser.shell_out("Length      : 3.2500");
        assert_eq!(parser.length(), Some(3.25));
    }

    #[test]
    fn test_real_stat_output() {
        let output = "Samples read:            143328\n\
                      Length (seconds):      3.250000\n\
                      Scaled by:         2147483647.0\n\
                      Maximum amplitude:     0.999969";
        let mut parser = LengthParser::new();
        for line in output.lines() {
            parser.shell_out(line);
        }
        parser.process_complete(0);
        assert_eq!(parser.length(), Some(3.25));
        assert_eq!(parser.exit_code(), Some(0));
    }

    #[test]
    fn test_label_without_colon_is_ignored() {
        let mut parser = LengthParser::new();
        parser.shell_out("Length");
        assert_eq!(parser.length(), None);
    }

    #[test]
    fn test_other_labels_ignored() {
        let mut parser = LengthParser::new();
        parser.shell_out("Maximum amplitude: 0.5");
        parser.shell_out("  Length: 2.0");
        assert_eq!(parser.length(), None);
    }

    #[test]
    fn test_malformed_value_keeps_previous() {
        let mut parser = LengthParser::new();
        parser.shell_out("Length (seconds): 1.5");
        parser.shell_out("Length (seconds): abc");
        parser.shell_out("Length (seconds):");
        parser.shell_out("Length: 1:2");
        assert_eq!(parser.length(), Some(1.5));
    }
}
