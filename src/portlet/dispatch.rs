/*
 * Responsibility
 * - phase dispatch helper: lifecycle 属性から phase を読み、response と突き合わせる
 * - filter / chain への受け渡しはすべてここを通る
 */
use crate::error::{PortletError, PortletResult};
use crate::portlet::filter::{FilterChain, PortletFilter};
use crate::portlet::phase::Phase;
use crate::portlet::request::{PortletRequest, PortletResponse};

/// Resolves the phase for a request/response pair.
pub fn resolve_phase(request: &PortletRequest, response: &PortletResponse) -> PortletResult<Phase> {
    let phase = request.lifecycle_phase()?;

    if response.phase() != phase {
        return Err(PortletError::configuration(format!(
            "{} response cannot be paired with a {} request",
            response.phase(),
            phase
        )));
    }

    Ok(phase)
}

/// Continue `chain` for the request's lifecycle phase.
pub async fn do_filter(
    request: &mut PortletRequest,
    response: &mut PortletResponse,
    chain: &mut dyn FilterChain,
) -> PortletResult<()> {
    let phase = resolve_phase(request, response)?;
    chain.do_filter(phase, request, response).await
}

/// Invoke `filter` for the request's lifecycle phase, failing if the filter
/// does not handle that phase.
pub async fn do_filter_with(
    filter: &dyn PortletFilter,
    request: &mut PortletRequest,
    response: &mut PortletResponse,
    chain: &mut dyn FilterChain,
) -> PortletResult<()> {
    let phase = resolve_phase(request, response)?;

    if !filter.supports(phase) {
        return Err(PortletError::configuration(format!(
            "Provided filter '{}' does not handle {} as required by the request",
            filter.name(),
            phase
        )));
    }

    filter.do_filter(phase, request, response, chain).await
}
