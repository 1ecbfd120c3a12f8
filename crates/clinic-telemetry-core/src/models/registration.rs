//! Doctor sign-up form.

use serde::{Deserialize, Serialize};

/// Fields sent with `SIGNUP`, in wire order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorRegistration {
    pub username: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    /// `dd-MM-yyyy` or `yyyy-MM-dd`
    pub birthday: String,
    /// `MALE` or `FEMALE`
    pub sex: String,
    pub email: String,
    pub specialty: String,
    pub license_number: String,
    pub dni: String,
}

impl DoctorRegistration {
    /// Argument frames for `SIGNUP`.
    pub fn wire_fields(&self) -> [&str; 10] {
        [
            &self.username,
            &self.password,
            &self.name,
            &self.surname,
            &self.birthday,
            &self.sex,
            &self.email,
            &self.specialty,
            &self.license_number,
            &self.dni,
        ]
    }
}
