//! Display-name derivation, run once over a finished forest.

use super::device::UsbDevice;
use super::forest::UsbForest;

/// Fallback when a device carries no identifying data at all.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Derive a display name for a device.
///
/// Priority: product string, then manufacturer plus product id, then
/// vendor/product ids, then [`UNKNOWN_DEVICE`]. Depends only on the parsed
/// fields, never on a previously assigned name.
pub fn derive_name(device: &UsbDevice) -> String {
    if let Some(product) = non_blank(device.product.as_deref()) {
        return product.to_string();
    }

    let vendor_id = device.vendor_id();
    let product_id = device.product_id();

    if let Some(manufacturer) = non_blank(device.manufacturer.as_deref())
        && let Some(product_id) = product_id
    {
        return format!("{} Product 0x{:04x}", manufacturer, product_id);
    }

    match (vendor_id, product_id) {
        (Some(vendor_id), Some(product_id)) => {
            format!("Vendor 0x{:04x}, Product 0x{:04x}", vendor_id, product_id)
        }
        _ => UNKNOWN_DEVICE.to_string(),
    }
}

/// Name every device record in the forest.
pub fn name_devices(forest: &mut UsbForest) {
    for device in forest.devices_mut() {
        device.name = Some(derive_name(device));
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
