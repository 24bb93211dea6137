use crate::{
    error::StoreError,
    models::{Crop, Market},
};

use super::store::Store;

const CROPS: [&str; 3] = ["Maize", "Wheat", "Tomato"];
const MARKETS: [(&str, &str); 3] = [
    ("Addis Ababa", "Addis Ababa"),
    ("Adama", "Oromia"),
    ("Bahir Dar", "Amhara"),
];

/// Inserts the reference crops and markets that are not present yet.
pub async fn seed_reference_data(store: &dyn Store) -> Result<(), StoreError> {
    let crops = store.list_crops().await?;
    for name in CROPS {
        if crops.iter().any(|c| c.name == name) {
            continue;
        }
        store.insert_crop(&Crop::new(name)).await?;
        tracing::info!(crop = name, "seeded crop");
    }

    let markets = store.list_markets().await?;
    for (name, region) in MARKETS {
        if markets.iter().any(|m| m.name == name && m.region == region) {
            continue;
        }
        store.insert_market(&Market::new(name, region)).await?;
        tracing::info!(market = name, region, "seeded market");
    }

    Ok(())
}
