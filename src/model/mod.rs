pub mod document;
pub mod employee;
pub mod identity;
pub mod matricula;
pub mod punch;
pub mod role;

pub use employee::{Employee, EmployeeUpdate, NewEmployee};
pub use identity::Identity;
pub use matricula::Matricula;
pub use punch::{
    AmendmentStamp, DayKey, GeoLocation, NewPunch, PunchAmendment, PunchId, PunchRecord,
    PunchType,
};
pub use role::{Branch, Role, Sex, Shift};
