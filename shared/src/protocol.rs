/// Container label listing the hostnames to publish, e.g. "web.local:8080,api.local"
pub const LABEL_PUBLISH: &str = "mdns.publish";

/// Container label carrying TXT properties, e.g. "path=/api,secure"
pub const LABEL_TXT: &str = "mdns.txt";

/// Container label overriding the service type for every published name
pub const LABEL_SERVICE_TYPE: &str = "mdns.servicetype";

/// Port used when a `mdns.publish` entry has no `:port` suffix
pub const DEFAULT_PORT: u16 = 80;

/// The only domain records may be published in
pub const LOCAL_SUFFIX: &str = ".local.";

/// TXT keys added to every record when verbose diagnostics are on
pub const TXT_CONTAINER_ID: &str = "container_id";
pub const TXT_PUBLISHED_AT: &str = "published_at";

const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (80, "_http._tcp"),
    (443, "_http._tcp"),
    (515, "_printer._tcp"),
    (631, "_ipp._tcp"),
    (9100, "_pdl-datastream._tcp"),
    (1883, "_mqtt._tcp"),
];

/// Look up the DNS-SD service type conventionally served on `port`
pub fn well_known_service_type(port: u16) -> Option<&'static str> {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, service_type)| *service_type)
}
