//! Browser backend over the Chrome DevTools Protocol (chromiumoxide).
//!
//! [`ChromeSession`] owns the browser and the tab; [`CdpPage`] implements
//! the live-page primitives by evaluating calls into the injected page
//! runtime.

pub mod chrome;
pub mod page;
pub mod script;

pub use chrome::ChromeSession;
pub use page::CdpPage;
pub use script::RuntimeScript;
