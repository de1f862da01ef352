// Plain-text presentation for the command line
use crate::models::{Booking, BusProvider, District, ProviderDetails, SearchResult};

pub const CURRENCY: &str = "৳";

pub fn districts(districts: &[District]) -> String {
    if districts.is_empty() {
        return "No districts available.".to_string();
    }
    districts
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No buses found for this route.".to_string();
    }

    let mut out = format!("Available Buses ({})\n", results.len());
    for (index, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} | {} -> {} ({}) | {}{}\n",
            index + 1,
            result.provider,
            result.from_district,
            result.to_district,
            result.dropping_point,
            CURRENCY,
            result.fare
        ));
    }
    out
}

pub fn booking(booking: &Booking) -> String {
    [
        format!(
            "REF: {}  [{}]",
            booking.booking_reference,
            booking.status.as_str().to_uppercase()
        ),
        format!("  {}", booking.customer_name),
        format!("  {}", booking.bus_provider),
        format!(
            "  {} -> {} ({})",
            booking.from_district, booking.to_district, booking.dropping_point
        ),
        format!("  {}", booking.travel_date.format("%d %b %Y")),
        format!("  {}{}", CURRENCY, booking.fare),
    ]
    .iter()
    .map(|line| format!("{line}\n"))
    .collect()
}

pub fn bookings(bookings: &[Booking]) -> String {
    let mut out = format!("Your Bookings ({})\n", bookings.len());
    if bookings.is_empty() {
        out.push_str("No bookings found\n");
        return out;
    }
    for entry in bookings {
        out.push('\n');
        out.push_str(&booking(entry));
    }
    out
}

pub fn providers(providers: &[&BusProvider]) -> String {
    if providers.is_empty() {
        return "No providers found.".to_string();
    }
    let mut out = String::new();
    for provider in providers {
        out.push_str(&provider.name);
        out.push('\n');
        // First line only; the details view shows the rest
        let contact = provider
            .contact_info
            .as_deref()
            .and_then(|c| c.lines().next())
            .unwrap_or("Not available");
        out.push_str(&format!("  {contact}\n"));
    }
    out
}

/// Sections for absent optional fields are left out entirely; only contact
/// info falls back to a placeholder.
pub fn provider_details(details: &ProviderDetails) -> String {
    let mut out = format!("{}\n", details.name);

    out.push_str(&format!(
        "\nContact Information\n  {}\n",
        details.contact_info.as_deref().unwrap_or("Not available")
    ));

    if let Some(address) = &details.address {
        out.push_str(&format!("\nOfficial Address\n  {address}\n"));
    }

    if let Some(website) = &details.website {
        out.push_str(&format!("\nWebsite\n  {website}\n"));
    }

    if !details.coverage_districts.is_empty() {
        let coverage: Vec<&str> = details.coverage_districts.iter().map(String::as_str).collect();
        out.push_str(&format!("\nCoverage Districts\n  {}\n", coverage.join(", ")));
    }

    if !details.routes.is_empty() {
        out.push_str("\nAvailable Routes\n");
        for (route, points) in &details.routes {
            out.push_str(&format!("  {route}\n"));
            for point in points {
                out.push_str(&format!(
                    "    {:<20} {}{}\n",
                    point.dropping_point, CURRENCY, point.price
                ));
            }
        }
    }

    if let Some(policy) = &details.privacy_policy {
        out.push_str(&format!("\nPrivacy Policy\n  {policy}\n"));
    }

    out
}
