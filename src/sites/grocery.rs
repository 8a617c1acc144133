use std::time::Duration;

use super::{AuthShape, FormAuth, Resource, TicketAuth};
use crate::extract::markup::Aggregation;

/// JSON field mapping for one transaction of the structured feed.
#[derive(Debug, Clone, Copy)]
pub struct TransactionFields {
    pub date: &'static str,
    pub location: &'static str,
    pub discount: &'static str,
    pub amount: &'static str,
}

/// Structured app API: ticket login plus JSON resources.
#[derive(Debug, Clone, Copy)]
pub struct GroceryFeed {
    pub auth: AuthShape,
    pub account_resource: Resource,
    pub transactions_resource: Resource,
    /// JSON pointers tried in order for the available balance.
    pub available_pointers: &'static [&'static str],
    pub transactions_pointer: &'static str,
    pub transaction_fields: TransactionFields,
}

/// Web dashboard used when the feed reports no balance.
#[derive(Debug, Clone, Copy)]
pub struct GroceryDashboard {
    pub auth: AuthShape,
    pub balance_resource: Resource,
    pub balance_selector: &'static str,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Copy)]
pub struct GrocerySite {
    pub topic_prefix: &'static str,
    pub feed: GroceryFeed,
    pub dashboard: GroceryDashboard,
}

const DASHBOARD_URL: &str = "https://www.ica.se/templates/ajaxresponse.aspx?ajaxFunction=DashboardAccountInfo&callerPageId=446575";

/// ICA loyalty account.
pub const fn ica() -> GrocerySite {
    GrocerySite {
        topic_prefix: "ica",
        feed: GroceryFeed {
            auth: AuthShape::Ticket(TicketAuth {
                login_url: "https://handla.api.ica.se/api/login/",
                ticket_header: "AuthenticationTicket",
                timeout: Duration::from_secs(10),
            }),
            account_resource: Resource {
                name: "account-balance",
                url: "https://handla.api.ica.se/api/user/cardaccounts",
            },
            transactions_resource: Resource {
                name: "transactions",
                url: "https://handla.api.ica.se/api/user/minbonustransaction",
            },
            available_pointers: &["/AvailableAmount", "/Cards/0/Accounts/0/Available"],
            transactions_pointer: "/Transactions",
            transaction_fields: TransactionFields {
                date: "TransactionDate",
                location: "LocationName",
                discount: "Discount",
                amount: "TransactionValue",
            },
        },
        dashboard: GroceryDashboard {
            auth: AuthShape::Form(FormAuth {
                warmup_urls: &[DASHBOARD_URL],
                login_url: "https://www.ica.se/logga-in/sso/?returnurl=https%3A%2F%2Fwww.ica.se%2Ftemplates%2Fajaxresponse.aspx%3FajaxFunction%3DDashboardAccountInfo%26callerPageId%3D446575",
                form_selector: "form",
                fallback_action: Some("https://ims.icagruppen.se/authn/authenticate/IcaCustomers"),
                username_field: "userName",
                password_field: "password",
                extra_headers: &[
                    ("Origin", "https://ims.icagruppen.se"),
                    (
                        "Accept",
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                    ("Accept-Language", "sv,en;q=0.8"),
                    ("Upgrade-Insecure-Requests", "1"),
                ],
                relay_url: Some("https://ims.icagruppen.se/oauth/v2/authorize?client_id=ica.se&forceAuthN=true"),
                marker: "account-container",
            }),
            balance_resource: Resource {
                name: "account-balance",
                url: DASHBOARD_URL,
            },
            balance_selector: "div.account-container.account-loaded.active dd",
            aggregation: Aggregation::First,
        },
    }
}
