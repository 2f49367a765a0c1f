use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode};

use crate::identity::model::SignedInUser;

/// Extractor for the user attached by the auth proxy middleware.
///
/// Rejects with `401 Unauthorized` when the request carries no identity.
#[derive(Clone, Debug)]
pub struct SignedIn(pub SignedInUser);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SignedInUser>()
            .cloned()
            .map(SignedIn)
            .ok_or((StatusCode::UNAUTHORIZED, "not signed in"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    use crate::identity::model::OrgRole;

    fn user() -> SignedInUser {
        SignedInUser {
            user_id: 1,
            org_id: 4,
            login: "alice".into(),
            email: None,
            name: None,
            org_role: OrgRole::Viewer,
            is_signed_in: true,
        }
    }

    #[tokio::test]
    async fn extracts_user_from_extensions() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut().insert(user());
        let (mut parts, _) = req.into_parts();

        let SignedIn(got) = SignedIn::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(got, user());
    }

    #[tokio::test]
    async fn rejects_anonymous_request() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let (status, _) = SignedIn::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
