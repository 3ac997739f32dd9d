mod abstracts;
mod registration;
mod setup;
mod token;
mod user;
mod volunteer;

pub use abstracts::{Abstract, AbstractEdits, AbstractId, NewAbstract, Status, Track};
pub use registration::{NewRegistration, Registration, RegistrationId};
pub use token::TokenStatus;
pub use user::{Role, User, UserId};
pub use volunteer::{NewVolunteerApplication, VolunteerApplication, VolunteerApplicationId};
