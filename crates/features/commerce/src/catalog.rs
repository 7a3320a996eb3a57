//! Parts catalog.

use crate::error::{CommerceError, CommerceErrorExt};
use crate::model::{PART_COLUMNS, Part, PartsPage, PartsQuery};
use feq_database::Database;
use feq_kernel::domain::constants::PARTS;

pub(crate) async fn search(db: &Database, query: &PartsQuery) -> Result<PartsPage, CommerceError> {
    let (limit, offset) = (query.limit(), query.offset());
    let mut request = db.anon().from(PARTS).select(PART_COLUMNS);

    if let Some(text) = query.search_text() {
        request = request.or(&format!("name.ilike.*{text}*,sku.ilike.*{text}*,brand.ilike.*{text}*"));
    }
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        request = request.eq("category", category);
    }
    if let Some(brand) = query.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        request = request.eq("brand", brand);
    }

    let page = request
        .order("name", true)
        .limit(limit)
        .offset(offset)
        .fetch_page::<Part>()
        .await
        .context("Searching parts")?;

    Ok(PartsPage { items: page.items, total: page.total, limit, offset })
}

pub(crate) async fn part_by_slug(db: &Database, slug: &str) -> Result<Part, CommerceError> {
    let part: Option<Part> = db
        .anon()
        .from(PARTS)
        .select(PART_COLUMNS)
        .eq("slug", slug)
        .fetch_optional()
        .await
        .context("Loading part")?;
    part.ok_or_else(|| CommerceError::not_found(format!("no part '{slug}'")))
}

/// Parts for `slugs`; unknown slugs are an error.
pub(crate) async fn parts_by_slugs(db: &Database, slugs: &[String]) -> Result<Vec<Part>, CommerceError> {
    let parts: Vec<Part> = db
        .anon()
        .from(PARTS)
        .select(PART_COLUMNS)
        .in_list("slug", slugs)
        .fetch()
        .await
        .context("Loading cart parts")?;

    if let Some(missing) = slugs.iter().find(|slug| !parts.iter().any(|p| &p.slug == *slug)) {
        return Err(CommerceError::not_found(format!("no part '{missing}'")));
    }
    Ok(parts)
}
