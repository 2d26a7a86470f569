//! Client side of the ISP back office: the REST client, the session gate and
//! the customer list controller that drives the console.

pub mod api;
pub mod controller;
pub mod error;
pub mod query;
pub mod session;

pub use api::{CustomerDirectory, CustomerPage, HttpBackofficeClient};
pub use controller::{
    CustomerListController, DeleteOutcome, FetchOutcome, ListEvent, ListView, Notification,
    NotificationLevel,
};
pub use error::{ApiFailure, ControllerError};
pub use query::{Column, ColumnVisibility, ListRequest, PageSize, QueryState, SortDirection};
pub use session::{AuthenticatedContext, SessionGate, SessionProbe, SessionState};
