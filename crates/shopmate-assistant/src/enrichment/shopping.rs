//! Purchase links for a product.

use shopmate_core::BuyLink;
use shopmate_providers::ShoppingSearch;

/// Up to `max` listings for `phrase`, skipping used items, in source order.
/// A failed search yields no links.
pub async fn buy_links(search: &dyn ShoppingSearch, phrase: &str, max: usize) -> Vec<BuyLink> {
    let results = match search.shopping(phrase).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(phrase = %phrase, error = %e, "Shopping search failed");
            return Vec::new();
        }
    };

    let links: Vec<BuyLink> = results
        .into_iter()
        .filter(|r| !r.price.to_lowercase().contains("used"))
        .take(max)
        .map(|r| BuyLink {
            title: r.title,
            link: r.link,
            price: r.price,
            image_url: r.image_url,
        })
        .collect();

    tracing::debug!(phrase = %phrase, count = links.len(), "Buy links selected");
    links
}
