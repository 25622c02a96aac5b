use async_trait::async_trait;
use serde::Serialize;

use crate::error::{PortletError, PortletResult};
use crate::host::container::Portlet;
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};
use crate::security::authentication::GrantedAuthority;
use crate::security::preauth::primary_id;

#[derive(Debug, Serialize)]
pub struct ProfileView<'a> {
    pub window: &'a str,
    pub phase: &'static str,
    pub principal: Option<String>,
    pub authenticated: bool,
    pub authorities: Vec<GrantedAuthority>,
    pub primary_attribute: Option<String>,
    pub session_id: Option<String>,
}

/// Renders what the security pipeline established for the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfilePortlet;

impl ProfilePortlet {
    pub fn view(request: &PortletRequest) -> ProfileView<'_> {
        let authentication = request.security().authentication();

        ProfileView {
            window: request.window_id(),
            phase: request.dispatched_phase().token(),
            principal: authentication.as_ref().map(|a| a.name().to_string()),
            authenticated: authentication.as_ref().is_some_and(|a| a.is_authenticated()),
            authorities: authentication
                .as_ref()
                .map(|a| a.authorities().to_vec())
                .unwrap_or_default(),
            primary_attribute: primary_id(request),
            session_id: request.session_id(),
        }
    }
}

#[async_trait]
impl Portlet for ProfilePortlet {
    async fn handle(
        &self,
        phase: Phase,
        request: &mut PortletRequest,
        response: &mut PortletResponse,
    ) -> PortletResult<()> {
        let body = serde_json::to_string(&Self::view(request))
            .map_err(|e| PortletError::container(e.to_string()))?;

        if phase == Phase::Resource {
            response.set_property("content-type", "application/json");
        }
        response.write(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::authentication::{Authentication, authority_list};
    use crate::security::context::SecurityContext;

    #[tokio::test]
    async fn renders_installed_authentication() {
        let mut req = PortletRequest::builder(Phase::Render).window_id("w1").build();
        req.security_mut().set_context(SecurityContext::with_authentication(
            Authentication::pre_authenticated_with_authorities("cat", None, authority_list(&["ROLE_USER"])),
        ));
        let mut res = PortletResponse::for_request(&req);

        ProfilePortlet.handle(Phase::Render, &mut req, &mut res).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(res.content().unwrap()).unwrap();
        assert_eq!(json["window"], "w1");
        assert_eq!(json["principal"], "cat");
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["authorities"][0], "ROLE_USER");
    }
}
