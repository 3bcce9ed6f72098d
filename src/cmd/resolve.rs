use anyhow::Result;

use tubelink::{Query, QueryType, YoutubeExtractor};

use super::output::print_result;
use crate::OutputFormat;

pub async fn cmd_resolve(
    extractor: &YoutubeExtractor,
    query: &str,
    kind: Option<QueryType>,
    format: OutputFormat,
) -> Result<()> {
    let query = match kind {
        Some(kind) => Query::new(query, kind),
        None => Query::detect(query),
    };
    eprintln!("🔎 Resolving {} as {}", query.raw, query.declared);

    let result = extractor.resolve(&query).await;
    if result.is_empty() {
        anyhow::bail!("No results for {}", query.raw);
    }

    print_result(&result, format);
    Ok(())
}
