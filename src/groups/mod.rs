//! Groups of tagged operations and the manager that creates them.
//!
//! A group stands for one scope whose observers come and go together, such as
//! one screen. Operations added to it keep running while the scope is torn
//! down and rebuilt; the rebuilt scope finds its group again through the
//! [`ObservableManager`] and reattaches to pick up missed outcomes.

mod group;
mod manager;

pub use group::{ObservableGroup, Resubscription};
pub use manager::ObservableManager;
