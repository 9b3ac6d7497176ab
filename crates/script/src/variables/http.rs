//! HTTP scripted I/O variables.
//!
//! The script sees three cooperating types: an `httprequest` builder, an
//! `httpclient` that sends requests, and the `httpresponse` snapshots it
//! returns. The client's configuration methods cover cookies, redirects,
//! keep-alive, proxying, and socket timeouts; enabling statistics
//! collection attaches a request counter and a request timer that are
//! collected with the rest of the job's trackers.

use super::trackers::{StatContext, StatTracker, TrackerKind};
use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_INTEGER, TYPE_STRING,
};
use crate::error::ScriptResult;
use std::time::Duration;
use tracing::{debug, warn};

/// The state of a request under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestState {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Default for HttpRequestState {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

impl HttpRequestState {
    /// The first header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received response snapshot. A status code of zero means the request
/// never produced a response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponseState {
    pub status_code: i64,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponseState {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Script variable for building requests.
#[derive(Debug, Default)]
pub struct HttpRequestVariable {
    state: HttpRequestState,
}

const REQUEST_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "seturl",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "setmethod",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "setbody",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "addheader",
        argument_types: &[TYPE_STRING, TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "geturl",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "getmethod",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "getheader",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_STRING),
    },
];

const REQUEST_SET_URL: usize = 0;
const REQUEST_SET_METHOD: usize = 1;
const REQUEST_SET_BODY: usize = 2;
const REQUEST_ADD_HEADER: usize = 3;
const REQUEST_GET_URL: usize = 4;
const REQUEST_GET_METHOD: usize = 5;
const REQUEST_GET_HEADER: usize = 6;

impl Variable for HttpRequestVariable {
    fn type_name(&self) -> &'static str {
        "httprequest"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        REQUEST_METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::HttpRequest(state) => {
                self.state = state.clone();
                Ok(())
            }
            other => Err(assign_type_error("httprequest", other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            REQUEST_SET_URL => {
                self.state.url = arguments[0].display_string();
                VariableValue::Null
            }
            REQUEST_SET_METHOD => {
                self.state.method = arguments[0].display_string().to_uppercase();
                VariableValue::Null
            }
            REQUEST_SET_BODY => {
                self.state.body = arguments[0].display_string();
                VariableValue::Null
            }
            REQUEST_ADD_HEADER => {
                self.state
                    .headers
                    .push((arguments[0].display_string(), arguments[1].display_string()));
                VariableValue::Null
            }
            REQUEST_GET_URL => VariableValue::Text(self.state.url.clone()),
            REQUEST_GET_METHOD => VariableValue::Text(self.state.method.clone()),
            REQUEST_GET_HEADER => VariableValue::Text(
                self.state
                    .header(&arguments[0].display_string())
                    .unwrap_or_default()
                    .to_string(),
            ),
            other => return Err(invalid_invocation("httprequest", other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::HttpRequest(self.state.clone())
    }

    fn value_string(&self) -> String {
        format!("{} {}", self.state.method, self.state.url)
    }
}

/// Script variable for inspecting responses.
#[derive(Debug, Default)]
pub struct HttpResponseVariable {
    state: HttpResponseState,
}

const RESPONSE_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "getstatuscode",
        argument_types: &[],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "getbody",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "getheader",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_STRING),
    },
];

const RESPONSE_GET_STATUS_CODE: usize = 0;
const RESPONSE_GET_BODY: usize = 1;
const RESPONSE_GET_HEADER: usize = 2;

impl Variable for HttpResponseVariable {
    fn type_name(&self) -> &'static str {
        "httpresponse"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        RESPONSE_METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::HttpResponse(state) => {
                self.state = state.clone();
                Ok(())
            }
            other => Err(assign_type_error("httpresponse", other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            RESPONSE_GET_STATUS_CODE => VariableValue::Integer(self.state.status_code),
            RESPONSE_GET_BODY => VariableValue::Text(self.state.body.clone()),
            RESPONSE_GET_HEADER => VariableValue::Text(
                self.state
                    .header(&arguments[0].display_string())
                    .unwrap_or_default()
                    .to_string(),
            ),
            other => return Err(invalid_invocation("httpresponse", other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::HttpResponse(self.state.clone())
    }

    fn value_string(&self) -> String {
        format!("status {}", self.state.status_code)
    }
}

/// Script variable that performs HTTP requests.
pub struct HttpClientVariable {
    cookies_enabled: bool,
    follow_redirects: bool,
    keep_alive: bool,
    proxy: Option<(String, u16)>,
    socket_timeout: Duration,
    collect_statistics: bool,
    request_counter: StatTracker,
    request_timer: StatTracker,
}

impl Default for HttpClientVariable {
    fn default() -> Self {
        Self {
            cookies_enabled: false,
            follow_redirects: true,
            keep_alive: true,
            proxy: None,
            socket_timeout: Duration::from_secs(30),
            collect_statistics: false,
            request_counter: StatTracker::new(TrackerKind::Counter, "HTTP Requests Attempted"),
            request_timer: StatTracker::new(TrackerKind::Duration, "HTTP Request Time"),
        }
    }
}

impl HttpClientVariable {
    /// Sends one request and snapshots whatever comes back. A transport
    /// failure yields a response with status code zero; the script decides
    /// what to do with it.
    fn send(&mut self, request: &HttpRequestState) -> HttpResponseState {
        if self.collect_statistics {
            self.request_counter.increment();
            self.request_timer.start_timer();
        }
        let response = self.send_inner(request);
        if self.collect_statistics {
            self.request_timer.stop_timer();
        }
        response
    }

    fn send_inner(&self, request: &HttpRequestState) -> HttpResponseState {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(self.socket_timeout)
            .cookie_store(self.cookies_enabled);
        if !self.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }
        if !self.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }
        if let Some((host, port)) = &self.proxy {
            match reqwest::Proxy::all(format!("http://{}:{}", host, port)) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(host = host.as_str(), port, error = %e, "ignoring bad proxy"),
            }
        }

        let client = match builder.build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "failed to build HTTP client");
                return HttpResponseState::default();
            }
        };

        let method = match request.method.parse::<reqwest::Method>() {
            Ok(method) => method,
            Err(_) => {
                warn!(method = request.method.as_str(), "invalid HTTP method");
                return HttpResponseState::default();
            }
        };

        let mut outbound = client.request(method, &request.url);
        for (name, value) in &request.headers {
            outbound = outbound.header(name, value);
        }
        if !request.body.is_empty() {
            outbound = outbound.body(request.body.clone());
        }

        match outbound.send() {
            Ok(response) => {
                let status_code = response.status().as_u16() as i64;
                let headers = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            value.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                let body = response.text().unwrap_or_default();
                debug!(url = request.url.as_str(), status_code, "request complete");
                HttpResponseState {
                    status_code,
                    headers,
                    body,
                }
            }
            Err(e) => {
                debug!(url = request.url.as_str(), error = %e, "request failed");
                HttpResponseState::default()
            }
        }
    }
}

const CLIENT_METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "sendrequest",
        argument_types: &["httprequest"],
        return_type: Some("httpresponse"),
    },
    MethodSignature {
        name: "enablecookies",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "disablecookies",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "setfollowredirects",
        argument_types: &[TYPE_BOOLEAN],
        return_type: None,
    },
    MethodSignature {
        name: "setkeepalive",
        argument_types: &[TYPE_BOOLEAN],
        return_type: None,
    },
    MethodSignature {
        name: "setproxy",
        argument_types: &[TYPE_STRING, TYPE_INTEGER],
        return_type: None,
    },
    MethodSignature {
        name: "setsockettimeout",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
    MethodSignature {
        name: "enablestatisticscollection",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "disablestatisticscollection",
        argument_types: &[],
        return_type: None,
    },
];

const CLIENT_SEND_REQUEST: usize = 0;
const CLIENT_ENABLE_COOKIES: usize = 1;
const CLIENT_DISABLE_COOKIES: usize = 2;
const CLIENT_SET_FOLLOW_REDIRECTS: usize = 3;
const CLIENT_SET_KEEP_ALIVE: usize = 4;
const CLIENT_SET_PROXY: usize = 5;
const CLIENT_SET_SOCKET_TIMEOUT: usize = 6;
const CLIENT_ENABLE_STATISTICS: usize = 7;
const CLIENT_DISABLE_STATISTICS: usize = 8;

impl Variable for HttpClientVariable {
    fn type_name(&self) -> &'static str {
        "httpclient"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        CLIENT_METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("httpclient", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            CLIENT_SEND_REQUEST => match &arguments[0] {
                VariableValue::HttpRequest(request) => {
                    VariableValue::HttpResponse(self.send(request))
                }
                other => {
                    return Err(crate::error::ScriptError::runtime(
                        0,
                        format!("sendrequest expects an httprequest, found {}", other.type_name()),
                    ))
                }
            },
            CLIENT_ENABLE_COOKIES => {
                self.cookies_enabled = true;
                VariableValue::Null
            }
            CLIENT_DISABLE_COOKIES => {
                self.cookies_enabled = false;
                VariableValue::Null
            }
            CLIENT_SET_FOLLOW_REDIRECTS => {
                self.follow_redirects = arguments[0].expect_boolean(0)?;
                VariableValue::Null
            }
            CLIENT_SET_KEEP_ALIVE => {
                self.keep_alive = arguments[0].expect_boolean(0)?;
                VariableValue::Null
            }
            CLIENT_SET_PROXY => {
                let host = arguments[0].display_string();
                let port = arguments[1].expect_integer(0)?.clamp(0, u16::MAX as i64) as u16;
                self.proxy = Some((host, port));
                VariableValue::Null
            }
            CLIENT_SET_SOCKET_TIMEOUT => {
                let millis = arguments[0].expect_integer(0)?.max(1) as u64;
                self.socket_timeout = Duration::from_millis(millis);
                VariableValue::Null
            }
            CLIENT_ENABLE_STATISTICS => {
                self.collect_statistics = true;
                VariableValue::Null
            }
            CLIENT_DISABLE_STATISTICS => {
                self.collect_statistics = false;
                VariableValue::Null
            }
            other => return Err(invalid_invocation("httpclient", other)),
        };
        Ok(result)
    }

    fn value_string(&self) -> String {
        format!(
            "httpclient (cookies {}, redirects {}, statistics {})",
            self.cookies_enabled, self.follow_redirects, self.collect_statistics
        )
    }

    fn start_stat_trackers(&mut self, context: &StatContext) {
        self.request_counter.start(context);
        self.request_timer.start(context);
    }

    fn stop_stat_trackers(&mut self) {
        self.request_counter.stop();
        self.request_timer.stop();
    }

    fn stat_trackers(&self) -> Vec<StatTracker> {
        if self.collect_statistics {
            vec![self.request_counter.clone(), self.request_timer.clone()]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_roundtrip() {
        let mut request = HttpRequestVariable::default();
        request
            .invoke(
                REQUEST_SET_URL,
                &[VariableValue::Text("http://example.com/".into())],
            )
            .unwrap();
        request
            .invoke(REQUEST_SET_METHOD, &[VariableValue::Text("post".into())])
            .unwrap();
        request
            .invoke(
                REQUEST_ADD_HEADER,
                &[
                    VariableValue::Text("Content-Type".into()),
                    VariableValue::Text("text/plain".into()),
                ],
            )
            .unwrap();

        assert_eq!(
            request.invoke(REQUEST_GET_METHOD, &[]).unwrap(),
            VariableValue::Text("POST".into())
        );
        assert_eq!(
            request
                .invoke(
                    REQUEST_GET_HEADER,
                    &[VariableValue::Text("content-type".into())]
                )
                .unwrap(),
            VariableValue::Text("text/plain".into())
        );
    }

    #[test]
    fn test_request_snapshot_assignment() {
        let mut source = HttpRequestVariable::default();
        source
            .invoke(
                REQUEST_SET_URL,
                &[VariableValue::Text("http://example.com/a".into())],
            )
            .unwrap();

        let mut copy = HttpRequestVariable::default();
        copy.assign(&source.as_value()).unwrap();
        assert_eq!(
            copy.invoke(REQUEST_GET_URL, &[]).unwrap(),
            VariableValue::Text("http://example.com/a".into())
        );
    }

    #[test]
    fn test_response_accessors() {
        let mut response = HttpResponseVariable::default();
        response
            .assign(&VariableValue::HttpResponse(HttpResponseState {
                status_code: 200,
                headers: vec![("Content-Length".into(), "12".into())],
                body: "hello world!".into(),
            }))
            .unwrap();

        assert_eq!(
            response.invoke(RESPONSE_GET_STATUS_CODE, &[]).unwrap(),
            VariableValue::Integer(200)
        );
        assert_eq!(
            response.invoke(RESPONSE_GET_BODY, &[]).unwrap(),
            VariableValue::Text("hello world!".into())
        );
        assert_eq!(
            response
                .invoke(
                    RESPONSE_GET_HEADER,
                    &[VariableValue::Text("content-length".into())]
                )
                .unwrap(),
            VariableValue::Text("12".into())
        );
    }

    #[test]
    fn test_client_statistics_toggle() {
        let mut client = HttpClientVariable::default();
        assert!(client.stat_trackers().is_empty());
        client.invoke(CLIENT_ENABLE_STATISTICS, &[]).unwrap();
        assert_eq!(client.stat_trackers().len(), 2);
        client.invoke(CLIENT_DISABLE_STATISTICS, &[]).unwrap();
        assert!(client.stat_trackers().is_empty());
    }
}
