//! USB data model types.

pub mod device;
pub mod endpoint;
pub mod forest;
pub mod naming;
pub mod slots;
pub mod speed;

pub use device::{
    Bandwidth, Configuration, DeviceDescriptor, DeviceKey, Interface, ProductIds, UsbDevice,
};
pub use endpoint::{Direction, Endpoint, TransferType};
pub use forest::{AttachOutcome, ROOT_NAME, UsbForest};
pub use naming::{UNKNOWN_DEVICE, derive_name, name_devices};
pub use slots::{SlotArray, SlotError};
pub use speed::UsbSpeed;
