//! Search and timeline commands.

use std::io::Write;

use tflog_core::{QueryEngine, SearchParams, SharedStore};

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, RecordList, Timeline};

/// Handler for `search` and `timeline`.
pub struct SearchCommand {
    engine: QueryEngine,
}

impl SearchCommand {
    /// Creates a handler over `store`.
    #[must_use]
    pub fn new(store: &SharedStore) -> Self {
        Self {
            engine: QueryEngine::new(store.clone()),
        }
    }

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid paging or an empty text query.
    pub fn search<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &SearchArgs,
    ) -> Result<(), CliError> {
        let records = self.engine.search(&params(args))?;
        format.write(writer, &RecordList { records })
    }

    /// Shows correlation id groups.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn timeline<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let groups = self.engine.timeline();
        format.write(writer, &Timeline { groups })
    }
}

fn params(args: &SearchArgs) -> SearchParams {
    SearchParams {
        q: args.q.clone(),
        level: args.level.clone(),
        correlation_id: args.correlation_id.clone(),
        from_ts: args.from.clone(),
        to_ts: args.to.clone(),
        limit: args.page.limit,
        offset: args.page.offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use tflog_core::{Importer, LogError, Store};

    fn command() -> SearchCommand {
        let store = Store::in_memory().shared();
        Importer::new(store.clone()).seed_demo().expect("seed demo");
        SearchCommand::new(&store)
    }

    #[test]
    fn search_by_level_json() {
        let args = SearchArgs {
            level: Some("ERROR".into()),
            ..Default::default()
        };
        let mut out = Vec::new();
        command()
            .search(&mut out, &OutputFormat::new(Format::Json), &args)
            .expect("search");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        let rows = value.as_array().map(Vec::len);
        assert_eq!(rows, Some(1));
        assert_eq!(value[0]["summary"], "POST /v1/orders failed");
    }

    #[test]
    fn search_text_without_terms() {
        let args = SearchArgs {
            q: Some("***".into()),
            ..Default::default()
        };
        let result = command().search(&mut std::io::sink(), &OutputFormat::default(), &args);
        assert!(matches!(result, Err(CliError::Log(LogError::InvalidQuery(_)))));
    }

    #[test]
    fn timeline_groups_demo_requests() {
        let mut out = Vec::new();
        command()
            .timeline(&mut out, &OutputFormat::new(Format::Json))
            .expect("timeline");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value[0]["correlation_id"], "demo-apply-1");
        assert_eq!(value[0]["count"], 2);
    }
}
