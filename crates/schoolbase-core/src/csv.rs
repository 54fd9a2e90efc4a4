//! Minimal CSV writer used by report exports.

/// Accumulates CSV rows in memory.
#[derive(Debug, Default)]
pub struct CsvWriter {
    buf: String,
}

impl CsvWriter {
    pub fn with_header<S: AsRef<str>>(header: &[S]) -> Self {
        let mut writer = Self::default();
        writer.row(header);
        writer
    }

    pub fn row<S: AsRef<str>>(&mut self, cells: &[S]) {
        let line = cells
            .iter()
            .map(|c| escape(c.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.buf.push_str(&line);
        self.buf.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let mut w = CsvWriter::with_header(&["metric", "value"]);
        w.row(&["average", "60.0"]);
        assert_eq!(w.finish(), "metric,value\r\naverage,60.0\r\n");
    }

    #[test]
    fn test_escapes_commas_and_quotes() {
        let mut w = CsvWriter::default();
        w.row(&["Doe, Jane", "said \"hi\""]);
        assert_eq!(w.finish(), "\"Doe, Jane\",\"said \"\"hi\"\"\"\r\n");
    }
}
