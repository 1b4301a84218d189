use std::io::{self, Write};

use serde::Serialize;

use crate::app::{PageResult, SearchResult, ShowResult};
use crate::catalog::RecordSink;
use crate::domain::NormalizedRecord;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_page(result: &PageResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_search(result: &SearchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_show(result: &ShowResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

// Results are printed whole once the batch settles.
impl RecordSink for JsonOutput {
    fn record(&self, _record: &NormalizedRecord) {}
}
