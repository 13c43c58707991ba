//! Metadata phase: derive object references from each search table and fetch them.

use log::debug;

use crate::adapters::{MetadataFetch, MetadataRef, MetadataSource};
use crate::engine::fetcher::PagedFetcher;
use crate::{CollectResult, Query, ResultSet, ResultTable, TableKey};

pub struct MetadataResolver<'a> {
    fetcher: &'a PagedFetcher<'a>,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(fetcher: &'a PagedFetcher<'a>) -> Self {
        Self { fetcher }
    }

    /// Fetch metadata for every query with a non-empty search table.
    ///
    /// Output keys are the search query, plus the category for categorized sources. Each
    /// resolved query is bracketed by a start and a completion message.
    pub fn resolve(
        &self,
        source: &dyn MetadataSource,
        search: &ResultSet<Query>,
    ) -> CollectResult<ResultSet<TableKey>> {
        let reporter = self.fetcher.reporter();
        let mut resolved = ResultSet::new();

        for (query, table) in search.iter() {
            let Some(table) = table.filter(|t| !t.is_empty()) else {
                continue;
            };
            reporter.message(format!("Querying {query} metadata."));
            let refs = source.derive_refs(query, table)?;
            debug!("{query}: {} metadata references", refs.len());

            // Category order follows the references; rows within a category keep fetch order.
            let mut grouped: Vec<(Option<String>, ResultTable)> = Vec::new();
            reporter.determinate(
                refs.as_slice(),
                |r: &MetadataRef| r.label.clone(),
                |r| {
                    let rows = match &r.fetch {
                        MetadataFetch::Single {
                            request,
                            unwrap_path,
                        } => self.fetcher.fetch_single(request, unwrap_path)?,
                        MetadataFetch::Paged(endpoint) => self.fetcher.fetch(endpoint, &r.label)?,
                    };
                    match grouped.iter_mut().find(|(c, _)| *c == r.category) {
                        Some((_, acc)) => acc.extend(rows),
                        None => grouped.push((r.category.clone(), rows)),
                    }
                    Ok(())
                },
            )?;

            for (category, rows) in grouped {
                resolved.insert(TableKey::new(query.clone(), category), Some(rows));
            }
            reporter.message("Metadata query complete.");
        }
        Ok(resolved)
    }
}
