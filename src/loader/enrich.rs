use super::models::Bundle;

/// Derived-field pass run over every bundle before range filtering.
///
/// Implementations must be deterministic. An error fails the whole batch it belongs to.
pub trait Enricher: Send + Sync {
    fn enrich(&self, bundle: &mut Bundle) -> anyhow::Result<()>;
}

/// Leaves bundles as the API served them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnricher;

impl Enricher for NoopEnricher {
    fn enrich(&self, _bundle: &mut Bundle) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<F> Enricher for F
where
    F: Fn(&mut Bundle) -> anyhow::Result<()> + Send + Sync,
{
    fn enrich(&self, bundle: &mut Bundle) -> anyhow::Result<()> {
        self(bundle)
    }
}

pub(crate) fn enrich_all(enricher: &dyn Enricher, bundles: &mut [Bundle]) -> anyhow::Result<()> {
    for bundle in bundles.iter_mut() {
        enricher.enrich(bundle)?;
        // Enrichers may rewrite timeSlot; range filtering must see the new value.
        bundle.sync_time_slot().map_err(anyhow::Error::msg)?;
    }
    Ok(())
}
