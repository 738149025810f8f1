/// Topic layout of the device twin channel.
pub struct Topics;

const TWIN_RESPONSE_PREFIX: &str = "$iothub/twin/res/";

impl Topics {
    /// Publish topic for a reported-property patch.
    #[inline]
    pub fn reported_patch(request_id: &str) -> String {
        format!("$iothub/twin/PATCH/properties/reported/?$rid={request_id}")
    }

    /// Subscription filter for twin operation responses.
    #[inline]
    pub fn twin_response_filter() -> String {
        format!("{TWIN_RESPONSE_PREFIX}#")
    }
}

/// Store response to a twin operation, parsed from the response topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwinResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Request correlation id, when the store echoed one
    pub request_id: Option<String>,
}

/// Parse `$iothub/twin/res/{status}/?$rid={id}&…` into a `TwinResponse`.
pub fn parse_twin_response(topic: &str) -> Option<TwinResponse> {
    let rest = topic.strip_prefix(TWIN_RESPONSE_PREFIX)?;
    let (status_part, query) = match rest.split_once("/?") {
        Some((status, query)) => (status, Some(query)),
        None => (rest, None),
    };
    let status = status_part.parse().ok()?;
    let request_id = query.and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("$rid=").map(str::to_string))
    });
    Some(TwinResponse { status, request_id })
}
