//! Service catalog
//!
//! Turnkey container specs for the services the panel offers out of the
//! box: Pi-hole (ad-blocking DNS), Ollama (local LLM runner) and Open
//! WebUI (chat frontend for Ollama). The service port of each spec is
//! published on a dynamically allocated host port at deploy time; ports
//! that must be well-known (DNS on 53) ride as fixed extra bindings.

use crate::deploy::containers::{ContainerSpec, PortBinding, VolumeMount};

/// Pi-hole ad-blocking DNS server.
///
/// The admin web interface is the allocated service port; DNS stays pinned
/// on 53 tcp/udp and the TLS admin port on its reserved host port. The
/// admin password travels as a container environment variable (Pi-hole's
/// documented interface) and is visible to local process listings of the
/// runtime, though never to a shell.
pub fn pihole(admin_password: &str, timezone: &str) -> ContainerSpec {
    let mut spec = ContainerSpec::new("pihole", "pihole/pihole", 80);
    spec.extra_ports = vec![
        PortBinding {
            host: 53,
            container: 53,
            udp: false,
        },
        PortBinding {
            host: 53,
            container: 53,
            udp: true,
        },
        PortBinding {
            host: 8453,
            container: 443,
            udp: false,
        },
    ];
    spec.volumes = vec![
        VolumeMount {
            host: "~/docker/pihole/config".into(),
            container: "/etc/pihole".into(),
        },
        VolumeMount {
            host: "~/docker/pihole/dnsmasq.d".into(),
            container: "/etc/dnsmasq.d".into(),
        },
    ];
    spec.env = vec![
        ("TZ".into(), timezone.into()),
        ("WEBPASSWORD".into(), admin_password.into()),
    ];
    spec.dns = vec!["127.0.0.1".into(), "1.1.1.1".into()];
    spec.restart = Some("unless-stopped".into());
    spec
}

/// Ollama local LLM runner; models persist in a named volume.
pub fn ollama() -> ContainerSpec {
    let mut spec = ContainerSpec::new("ollama", "ollama/ollama", 11434);
    spec.volumes = vec![VolumeMount {
        host: "ollama".into(),
        container: "/root/.ollama".into(),
    }];
    spec
}

/// Open WebUI chat frontend, reaching Ollama through the host gateway.
pub fn open_webui() -> ContainerSpec {
    let mut spec = ContainerSpec::new("open-webui", "ghcr.io/open-webui/open-webui:main", 8080);
    spec.volumes = vec![VolumeMount {
        host: "open-webui".into(),
        container: "/app/backend/data".into(),
    }];
    spec.add_hosts = vec!["host.docker.internal:host-gateway".into()];
    spec.restart = Some("always".into());
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pihole_pins_dns_ports() {
        let spec = pihole("hunter2", "America/New_York");
        assert_eq!(spec.name, "pihole");
        assert_eq!(spec.container_port, 80);
        assert!(
            spec.extra_ports
                .iter()
                .any(|b| b.host == 53 && b.container == 53 && b.udp)
        );
        assert!(
            spec.extra_ports
                .iter()
                .any(|b| b.host == 53 && b.container == 53 && !b.udp)
        );
        assert!(
            spec.env
                .iter()
                .any(|(k, v)| k == "WEBPASSWORD" && v == "hunter2")
        );
    }

    #[test]
    fn test_ollama_uses_named_volume() {
        let spec = ollama();
        assert_eq!(spec.container_port, 11434);
        assert_eq!(spec.volumes[0].host, "ollama");
        assert!(spec.extra_ports.is_empty());
    }

    #[test]
    fn test_open_webui_reaches_host_gateway() {
        let spec = open_webui();
        assert_eq!(spec.image, "ghcr.io/open-webui/open-webui:main");
        assert_eq!(spec.add_hosts, vec!["host.docker.internal:host-gateway"]);
        assert_eq!(spec.restart.as_deref(), Some("always"));
    }
}
