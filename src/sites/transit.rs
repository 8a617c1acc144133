use super::{AuthShape, JsonDashboardAuth, Resource, TabSelector};

/// A transit operator's smartcard portal.
#[derive(Debug, Clone, Copy)]
pub struct TransitSite {
    pub topic_prefix: &'static str,
    pub auth: AuthShape,
    pub card_overview: Resource,
    pub tabs: TabSelector,
    /// Every `<n> kr` on the page; all matches are summed.
    pub cash_pattern: &'static str,
    /// Captures the start and end date of an active period pass.
    pub pass_window_pattern: &'static str,
    /// Captures a `YYYY-MM-DD HH:MM` "last updated" annotation.
    pub card_updated_pattern: &'static str,
}

const CARD_OVERVIEW_URL: &str = "https://webtick.ostgotatrafiken.se/webtick/user/pages/CardOverview.iface";

/// Östgötatrafiken webtick.
pub const fn ostgotatrafiken() -> TransitSite {
    TransitSite {
        topic_prefix: "otraf",
        auth: AuthShape::JsonDashboard(JsonDashboardAuth {
            login_url: "https://www.ostgotatrafiken.se/ajax/Login/Attempt",
            content_type: "application/x-www-form-urlencoded;charset=UTF-8",
            body_template: r#"={"authSource":10,"keepMeLimitedLoggedIn":true,"userName":{username},"password":{password},"impersonateUserName":""}"#,
            dashboard_url: CARD_OVERVIEW_URL,
            marker: "formLinkedCardRequests",
        }),
        card_overview: Resource {
            name: "card-overview",
            url: CARD_OVERVIEW_URL,
        },
        tabs: TabSelector {
            payload_scope: "#formLinkedCardRequests",
            container: "#form1cardOverviewTabs",
            item: "span",
            target_suffix: "Link",
            target_fields: &[
                "ice.focus",
                "ice.event.captured",
                "javax.faces.source",
                "form1cardOverviewTabs:j_idcl",
            ],
            click_fields: &[
                ("name", "formLinkedCardRequests"),
                ("form1cardOverviewTabs", "form1cardOverviewTabs"),
                ("ice.event.alt", "false"),
                ("ice.event.ctrl", "false"),
                ("ice.event.left", "true"),
                ("ice.event.meta", "false"),
                ("ice.event.right", "false"),
                ("ice.event.shift", "false"),
                ("ice.event.type", "onclick"),
                ("ice.event.x", "644"),
                ("ice.event.y", "372"),
                ("ice.submit.serialization", "form"),
                ("ice.submit.type", "ice.s"),
                ("javax.faces.partial.ajax", "true"),
                ("javax.faces.partial.event", "click"),
                ("javax.faces.partial.execute", "@all"),
                ("javax.faces.partial.render", "@all"),
            ],
        },
        cash_pattern: r"(\d+) kr",
        pass_window_pattern: r"(?s)Fr(?:å|&#229;)n\s*(\d{4}-\d{2}-\d{2}).*?Till\s*(\d{4}-\d{2}-\d{2})",
        card_updated_pattern: r"\(Senast uppdaterat[^)]*?(\d{4}-\d{2}-\d{2} \d{2}:\d{2})[^)]*\)",
    }
}
