//! Profile commands.

use harbor_core::Email;
use harbor_storefront::profile::{Profile, ProfileEdit};
use harbor_storefront::{AppError, AppState};

/// Print the profile of the logged-in user.
///
/// # Errors
///
/// Returns an error if nobody is logged in or the profile cannot be loaded.
pub async fn show(state: &AppState) -> Result<(), AppError> {
    let profile = state.profile().load_profile().await?;
    print_profile(&profile);
    Ok(())
}

/// Change the given fields and print the saved profile.
///
/// # Errors
///
/// Returns an error if nothing was given to change, nobody is logged in, or
/// the backend refuses the update.
pub async fn update(
    state: &AppState,
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<(), AppError> {
    if name.is_none() && phone.is_none() && address.is_none() {
        return Err(AppError::BadRequest(
            "Nothing to update; pass --name, --phone or --address".to_string(),
        ));
    }

    let profiles = state.profile();
    let address = match address {
        Some(line) => Some(profiles.directory().await?.parse(&line)),
        None => None,
    };

    let profile = profiles
        .save_profile(ProfileEdit {
            name,
            phone,
            address,
        })
        .await?;
    print_profile(&profile);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_profile(profile: &Profile) {
    let or_dash = |value: Option<&str>| value.unwrap_or("-").to_string();

    println!("Email:    {}", or_dash(profile.email.as_ref().map(Email::as_str)));
    println!("Name:     {}", or_dash(profile.name.as_deref()));
    println!("Phone:    {}", or_dash(profile.phone.as_deref()));
    println!("City:     {}", or_dash(profile.address.city.as_deref()));
    println!("District: {}", or_dash(profile.address.district.as_deref()));
    println!("Address:  {}", profile.address.detail);
}
