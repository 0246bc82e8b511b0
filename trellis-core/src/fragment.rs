//! View replies and element wrapping.
//!
//! A [`Reply`] records whether its body has already been wrapped in an
//! element container. Wrapping an already wrapped reply is a no-op, so a
//! handler can return its own [`Reply::Element`] and override the view's
//! container entirely.

use crate::config::Settings;
use crate::markup::escape_attr;
use crate::oob::OobEntry;
use crate::HttpResponse;

/// How a view's output is wrapped in a container element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    /// Value of the `id` attribute; omitted when `None` or empty
    pub element_id: Option<String>,
    pub tag: String,
    pub hx_target: String,
    pub hx_swap: String,
    /// Extra attributes rendered after the htmx ones
    pub attrs: Vec<(String, String)>,
    /// Leave the body unwrapped
    pub nowrap: bool,
}

impl Default for ElementMeta {
    fn default() -> Self {
        Self {
            element_id: None,
            tag: "div".to_string(),
            hx_target: "this".to_string(),
            hx_swap: "outerHTML".to_string(),
            attrs: Vec::new(),
            nowrap: false,
        }
    }
}

impl ElementMeta {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: Some(element_id.into()),
            ..Self::default()
        }
    }

    /// Defaults taken from configuration
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            element_id: None,
            tag: settings.element.tag.clone(),
            hx_target: settings.element.hx_target.clone(),
            hx_swap: settings.element.hx_swap.clone(),
            attrs: Vec::new(),
            nowrap: false,
        }
    }

    pub fn id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn hx_target(mut self, target: impl Into<String>) -> Self {
        self.hx_target = target.into();
        self
    }

    pub fn hx_swap(mut self, swap: impl Into<String>) -> Self {
        self.hx_swap = swap.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn nowrap(mut self, nowrap: bool) -> Self {
        self.nowrap = nowrap;
        self
    }

    /// Opening tag. Empty `id`, `hx-target` and `hx-swap` values are
    /// omitted; extra attributes are always rendered.
    pub fn open_tag(&self) -> String {
        let mut out = format!("<{}", self.tag);
        let htmx = [
            ("id", self.element_id.as_deref().unwrap_or("")),
            ("hx-target", self.hx_target.as_str()),
            ("hx-swap", self.hx_swap.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty());
        let extra = self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        for (name, value) in htmx.chain(extra) {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        out
    }

    pub fn close_tag(&self) -> String {
        format!("</{}>", self.tag)
    }
}

/// Response body plus the out-of-band fragments still to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub response: HttpResponse,
    pub oob: Vec<OobEntry>,
}

/// What a view returns
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Handler output not yet placed in a container
    Raw(Envelope),
    /// Output already wrapped, or marked as final by the handler
    Element(Envelope),
}

impl Reply {
    pub fn raw(response: HttpResponse) -> Self {
        Reply::Raw(Envelope {
            response,
            oob: Vec::new(),
        })
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self::raw(HttpResponse::html(markup))
    }

    /// Wrap `response` with `meta` right away; the view's own element
    /// settings will not apply to it again
    pub fn element(response: HttpResponse, meta: &ElementMeta) -> Self {
        wrap(Self::raw(response), meta)
    }

    fn envelope(&self) -> &Envelope {
        match self {
            Reply::Raw(env) | Reply::Element(env) => env,
        }
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            Reply::Raw(env) | Reply::Element(env) => env,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Reply::Element(_))
    }

    pub fn response(&self) -> &HttpResponse {
        &self.envelope().response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.envelope_mut().response
    }

    pub fn pending_oob(&self) -> &[OobEntry] {
        &self.envelope().oob
    }

    pub(crate) fn queue_oob(&mut self, entries: impl IntoIterator<Item = OobEntry>) {
        self.envelope_mut().oob.extend(entries);
    }

    pub(crate) fn take_oob(&mut self) -> Vec<OobEntry> {
        std::mem::take(&mut self.envelope_mut().oob)
    }

    /// Append pending out-of-band fragments to the body, once.
    ///
    /// Responses that are not HTML, or are streamed, cannot carry appended
    /// markup; their pending fragments are dropped.
    pub fn flush_oob(&mut self) {
        let env = self.envelope_mut();
        if env.oob.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut env.oob);
        if !env.response.is_html() || env.response.streaming {
            tracing::debug!(
                dropped = pending.len(),
                "Response cannot carry out-of-band fragments"
            );
            return;
        }
        for entry in pending {
            env.response.body.extend_from_slice(entry.rendered.as_bytes());
        }
    }

    pub fn into_parts(self) -> (HttpResponse, Vec<OobEntry>) {
        match self {
            Reply::Raw(env) | Reply::Element(env) => (env.response, env.oob),
        }
    }

    /// Final response with any pending fragments appended
    pub fn into_response(mut self) -> HttpResponse {
        self.flush_oob();
        self.into_parts().0
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Reply::raw(response)
    }
}

/// Swap `response` into the page body regardless of the requesting element.
///
/// Sets `HX-Retarget: body` and `HX-Reswap`, and marks the reply as wrapped
/// so no container is added around it.
pub fn body_response(response: HttpResponse, swap: &str) -> Reply {
    let response = response
        .with_header("HX-Retarget", "body")
        .with_header("HX-Reswap", swap);
    Reply::Element(Envelope {
        response,
        oob: Vec::new(),
    })
}

/// Place a raw reply's body inside the container `meta` describes.
///
/// Already wrapped replies, `nowrap` metadata, non-HTML bodies and streamed
/// responses pass through unchanged.
pub fn wrap(reply: Reply, meta: &ElementMeta) -> Reply {
    let mut env = match reply {
        Reply::Element(_) => return reply,
        Reply::Raw(env) => env,
    };
    if meta.nowrap || !env.response.is_html() || env.response.streaming {
        return Reply::Raw(env);
    }

    let open = meta.open_tag();
    let close = meta.close_tag();
    let mut body = Vec::with_capacity(open.len() + env.response.body.len() + close.len());
    body.extend_from_slice(open.as_bytes());
    body.extend_from_slice(&env.response.body);
    body.extend_from_slice(close.as_bytes());
    env.response.body = body;
    Reply::Element(env)
}
