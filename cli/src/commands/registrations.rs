use crate::cli::RegistrationsSubcommands;

use anyhow::{bail, Result};
use rwamp::Session;

pub async fn run(session: &Session, sub: &RegistrationsSubcommands) -> Result<()> {
  match sub {
    RegistrationsSubcommands::List => {
      let list = session.registration_list().await?;
      println!("exact:    {:?}", list.exact);
      println!("prefix:   {:?}", list.prefix);
      println!("wildcard: {:?}", list.wildcard);
    }
    RegistrationsSubcommands::Lookup { procedure } => match session.registration_lookup(procedure).await? {
      Some(id) => println!("{}", id),
      None => bail!("no registration for {:?}", procedure),
    },
    RegistrationsSubcommands::Info { id } => {
      let info = session.registration_info(*id).await?;
      println!("id:      {}", info.id);
      println!("uri:     {}", info.uri);
      println!("match:   {}", info.match_policy);
      println!("invoke:  {}", info.invoke);
      println!("created: {}", info.created);
    }
  }
  Ok(())
}
