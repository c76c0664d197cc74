/// Authentication request and response bodies
///
/// Sign-in returns a two-element array, token first:
///
/// ```json
/// { "data": ["eyJ...", { "userId": 1, "username": "bob", "role": "Admin" }] }
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::user::User;

/// Body of `POST auth/signin`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Response of `POST auth/signin`
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    pub data: (String, User),
}

impl SignInResponse {
    pub fn into_parts(self) -> (String, User) {
        self.data
    }
}

/// Body of `POST auth/signup`
///
/// Registers an organization together with its first admin user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub organization_name: String,
    pub industry: String,
    pub established: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    #[test]
    fn test_sign_in_response_tuple() {
        let response: SignInResponse = serde_json::from_str(
            r#"{"data": ["tok", {"userId": 1, "username": "bob", "role": "Admin"}]}"#,
        )
        .unwrap();
        let (token, user) = response.into_parts();
        assert_eq!(token, "tok");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_sign_up_request_wire_shape() {
        let request = SignUpRequest {
            username: "bob".to_string(),
            password: "secret1".to_string(),
            organization_name: "Acme".to_string(),
            industry: "IT".to_string(),
            established: NaiveDate::from_ymd_opt(2001, 5, 4).unwrap(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["organizationName"], "Acme");
        assert_eq!(json["established"], "2001-05-04");
    }
}
