use crate::core::{CallChain, ImpactAnalysisResult, IndexStatistics};
use colored::*;
use std::io::Write;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

pub trait OutputWriter {
    fn write_results(&mut self, results: &[ImpactAnalysisResult]) -> anyhow::Result<()>;

    fn write_statistics(&mut self, statistics: &IndexStatistics) -> anyhow::Result<()>;

    fn write_tables(&mut self, tables: &[String]) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    /// One result is written as an object, several as an array
    fn write_results(&mut self, results: &[ImpactAnalysisResult]) -> anyhow::Result<()> {
        let json = match results {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(results)?,
        };
        writeln!(self.writer, "{json}")?;
        Ok(())
    }

    fn write_statistics(&mut self, statistics: &IndexStatistics) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", serde_json::to_string_pretty(statistics)?)?;
        Ok(())
    }

    fn write_tables(&mut self, tables: &[String]) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", serde_json::to_string_pretty(tables)?)?;
        Ok(())
    }
}

/// Human-readable report, one block per table
pub struct TextWriter<W: Write> {
    writer: W,
    color: bool,
}

impl<W: Write> TextWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            color: true,
        }
    }

    /// Writer that never emits ANSI escapes
    pub fn plain(writer: W) -> Self {
        Self {
            writer,
            color: false,
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().blue().to_string()
        } else {
            text.to_string()
        }
    }

    fn rule(&mut self, ch: char) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", ch.to_string().repeat(RULE_WIDTH))?;
        Ok(())
    }

    fn write_result(&mut self, result: &ImpactAnalysisResult) -> anyhow::Result<()> {
        self.rule('=')?;
        let title = self.heading("IMPACT ANALYSIS REPORT");
        writeln!(self.writer, "{title}")?;
        self.rule('=')?;
        writeln!(self.writer, "Table: {}", result.table_name)?;
        self.rule('-')?;
        writeln!(self.writer)?;

        let summary = self.heading("SUMMARY:");
        writeln!(self.writer, "{summary}")?;
        writeln!(self.writer, "  Total Impacts: {}", result.impacts.len())?;
        writeln!(self.writer, "  Total Call Chains: {}", result.call_chains.len())?;
        writeln!(
            self.writer,
            "  Unresolved Repository References: {}",
            result.unresolved_repository_references.len()
        )?;
        writeln!(self.writer, "  Warnings: {}", result.warnings.len())?;
        writeln!(self.writer)?;

        self.write_chains(&result.call_chains)?;
        self.write_impacts(result)?;
        self.write_list("UNRESOLVED REPOSITORY REFERENCES:", &result.unresolved_repository_references)?;
        self.write_list("WARNINGS:", &result.warnings)?;

        self.rule('=')?;
        Ok(())
    }

    fn write_chains(&mut self, chains: &[CallChain]) -> anyhow::Result<()> {
        if chains.is_empty() {
            return Ok(());
        }
        let heading = self.heading("CALL CHAINS (Service -> Repository -> Table):");
        writeln!(self.writer, "{heading}")?;
        self.rule('-')?;
        for (i, chain) in chains.iter().enumerate() {
            write!(self.writer, "{}. ", i + 1)?;
            for (hop, caller) in chain.call_path.iter().enumerate() {
                write!(self.writer, "{caller}")?;
                if let Some(line) = chain.line_numbers.get(hop).filter(|line| **line > 0) {
                    write!(self.writer, " [line:{line}]")?;
                }
                write!(self.writer, "\n   -> ")?;
            }
            writeln!(self.writer, "{}", chain.repository_method)?;
            writeln!(self.writer, "   -> [Table: {}]", chain.table_name)?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_impacts(&mut self, result: &ImpactAnalysisResult) -> anyhow::Result<()> {
        if result.impacts.is_empty() {
            return Ok(());
        }
        let heading = self.heading("IMPACTED SERVICE METHODS:");
        writeln!(self.writer, "{heading}")?;
        self.rule('-')?;
        for (i, impact) in result.impacts.iter().enumerate() {
            writeln!(self.writer, "{}. Module: {}", i + 1, impact.module)?;
            writeln!(self.writer, "   Mapper XML: {}", impact.mapper_file.display())?;
            writeln!(self.writer, "   Mapper Method: {}", impact.fully_qualified_statement())?;
            writeln!(
                self.writer,
                "   Service Method: {}",
                impact.fully_qualified_business_method()
            )?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_list(&mut self, title: &str, items: &[String]) -> anyhow::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let heading = self.heading(title);
        writeln!(self.writer, "{heading}")?;
        self.rule('-')?;
        for item in items {
            writeln!(self.writer, "  - {item}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for TextWriter<W> {
    fn write_results(&mut self, results: &[ImpactAnalysisResult]) -> anyhow::Result<()> {
        for result in results {
            self.write_result(result)?;
        }
        Ok(())
    }

    fn write_statistics(&mut self, statistics: &IndexStatistics) -> anyhow::Result<()> {
        let heading = self.heading("Index Statistics");
        writeln!(self.writer, "{heading}")?;
        self.rule('-')?;
        for (label, value) in statistics.entries() {
            writeln!(self.writer, "  {label:<32} {value}")?;
        }
        Ok(())
    }

    fn write_tables(&mut self, tables: &[String]) -> anyhow::Result<()> {
        for table in tables {
            writeln!(self.writer, "{table}")?;
        }
        Ok(())
    }
}

pub fn create_writer(format: OutputFormat, writer: Box<dyn Write>) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Text => Box::new(TextWriter::new(writer)),
    }
}
